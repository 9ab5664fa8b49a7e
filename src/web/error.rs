use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Subscription not found")]
    SubscriptionNotFound,
    #[error("Subscription already processed")]
    AlreadyProcessed,
    #[error("Subscription request could not be processed")]
    UnexpectedOutcome,
    #[error("Service unavailable")]
    ServiceUnavailable,
    #[error("Malformed body: {0}")]
    MalformedBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use ApiError::*;
        let status_code = match self {
            SubscriptionNotFound => StatusCode::NOT_FOUND,
            AlreadyProcessed => StatusCode::CONFLICT,
            UnexpectedOutcome => StatusCode::BAD_REQUEST,
            ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            MalformedBody(_) => StatusCode::BAD_REQUEST,
        };

        let body = json!({
            "message": self.to_string()
        });

        (status_code, Json(body)).into_response()
    }
}
