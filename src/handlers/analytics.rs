use crate::{db, error::AppError, models::AnalyticsSummary, store::LinkStore, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

/// GET /analytics/:code
///
/// Aggregated click data for one short link. Reads go straight to the
/// database — analytics is not on the redirect hot path and has no cache.
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let link = state
        .store
        .find_by_code(&code)
        .await?
        .ok_or(AppError::NotFound)?;

    let summary = db::get_analytics(&state.db, &link).await?;
    Ok(Json(summary))
}
