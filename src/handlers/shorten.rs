use crate::{error::AppError, shortener, AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

/// Response carries both the bare code and the full short URL so clients can
/// copy either without string assembly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
}

/// POST /shorten
///
/// Body: `{"url": "https://..."}`. Returns 201 with the allocated code, 400
/// for malformed URLs, 500 if the code space is exhausted or storage fails.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShortenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let link = shortener::allocate(&state.store, req.url.trim()).await?;

    let response = ShortenResponse {
        short_url: state.config.short_url(&link.short_code),
        short_code: link.short_code,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
