use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{utils::state::AppState, web::error::ApiError};

const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    pub subscriber_id: i64,
}

/// The only thing callers learn is whether access is allowed
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(rename = "subscriberID")]
    pub subscriber_id: i64,
    #[serde(rename = "creatorIDs")]
    pub creator_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BatchDecision {
    #[serde(rename = "creatorID")]
    pub creator_id: i64,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub decisions: Vec<BatchDecision>,
}

pub async fn authorize(
    State(state): State<AppState>,
    Path(creator_id): Path<i64>,
    Query(params): Query<AuthorizeParams>,
) -> impl IntoResponse {
    let decision = state
        .authorizer
        .scope()
        .authorize(creator_id, params.subscriber_id)
        .await;

    Json(AuthorizeResponse {
        allowed: decision.allowed(),
    })
}

// Authorize every item of a listing through a single gate scope
pub async fn authorize_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.creator_ids.len() > MAX_BATCH_SIZE {
        return Err(ApiError::MalformedBody(format!(
            "at most {MAX_BATCH_SIZE} creators per request"
        )));
    }

    let gate = state.authorizer.scope();
    let decisions = gate
        .authorize_many(request.subscriber_id, &request.creator_ids)
        .await
        .into_iter()
        .map(|(creator_id, decision)| BatchDecision {
            creator_id,
            allowed: decision.allowed(),
        })
        .collect();

    Ok(Json(BatchResponse { decisions }))
}
