use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level error taxonomy for the shorten / redirect paths.
///
/// Short-code collisions never appear here: they are absorbed inside the
/// allocator's retry loop (see `shortener::allocate`) and only surface as
/// `CodeSpaceExhausted` once the attempt cap is spent.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("short link not found")]
    NotFound,

    #[error("could not allocate a unique short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            // Expected outcome for probing, not worth an error log.
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::CodeSpaceExhausted { attempts } => {
                // At 62^8 codes and 5 attempts this implies a broken RNG or a
                // near-saturated keyspace, so treat it as a loud anomaly.
                tracing::error!("short-code space exhausted after {} attempts", attempts);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Storage(e) => {
                tracing::error!("storage failure: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
