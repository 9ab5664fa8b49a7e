use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::{
    models::{SubscriptionOutcome, SubscriptionQuery, SubscriptionRecord},
    subscription::SubscriptionError,
    utils::state::AppState,
    web::error::ApiError,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub message: String,
    pub data: Vec<SubscriptionRecord>,
}

// Approve a pending subscription request
pub async fn accept_subscription(
    State(state): State<AppState>,
    Json(query): Json<SubscriptionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .client
        .approve(query)
        .await
        .map_err(|err| unavailable("approve", &query, err))?;

    respond(outcome, SubscriptionOutcome::Approved, "Subscription accepted")
}

// Reject a pending subscription request
pub async fn reject_subscription(
    State(state): State<AppState>,
    Json(query): Json<SubscriptionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .client
        .reject(query)
        .await
        .map_err(|err| unavailable("reject", &query, err))?;

    respond(outcome, SubscriptionOutcome::Rejected, "Subscription rejected")
}

pub async fn pending_requests(
    State(state): State<AppState>,
    Path(subscriber_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .client
        .list_pending_for_creator(subscriber_id)
        .await
        .map_err(|err| {
            tracing::error!("Failed to list pending requests for {subscriber_id}: {err}");
            ApiError::ServiceUnavailable
        })?;

    Ok(Json(RecordsResponse {
        message: "OK".to_string(),
        data,
    }))
}

pub async fn subscribers(
    State(state): State<AppState>,
    Path(creator_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .client
        .list_subscribers(creator_id)
        .await
        .map_err(|err| {
            tracing::error!("Failed to list subscribers of {creator_id}: {err}");
            ApiError::ServiceUnavailable
        })?;

    Ok(Json(RecordsResponse {
        message: "OK".to_string(),
        data,
    }))
}

fn unavailable(action: &str, query: &SubscriptionQuery, err: SubscriptionError) -> ApiError {
    tracing::error!(
        error = %err,
        creator_id = query.creator_id,
        subscriber_id = query.subscriber_id,
        "Failed to {action} subscription"
    );
    ApiError::ServiceUnavailable
}

fn respond(
    outcome: SubscriptionOutcome,
    success: SubscriptionOutcome,
    message: &str,
) -> Result<Json<MessageResponse>, ApiError> {
    match outcome {
        outcome if outcome == success => Ok(Json(MessageResponse {
            message: message.to_string(),
        })),
        SubscriptionOutcome::NotFound => Err(ApiError::SubscriptionNotFound),
        SubscriptionOutcome::AlreadyProcessed => Err(ApiError::AlreadyProcessed),
        _ => Err(ApiError::UnexpectedOutcome),
    }
}
