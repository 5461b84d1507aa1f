use crate::{db, error::AppError, rate_limit, resolver, store::LinkStore, AppState};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};

/// GET /:code
///
/// 1. Resolve the code through the cache-aside path (cache, then database).
/// 2. Spawn a background task to record the click so the redirect is never
///    blocked — or failed — by the analytics write.
/// 3. Return a 301 redirect to the destination URL.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let destination = resolver::resolve(&state.store, &state.cache, &code).await?;

    let ip = rate_limit::client_ip(&headers, addr);
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let referer = headers
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // Clone everything the background task needs so it owns its data. Any
    // failure in here is logged and dropped; it must never reach the client.
    let state_bg = state.clone();
    tokio::spawn(async move {
        record_click(&state_bg, &code, &ip, user_agent.as_deref(), referer.as_deref()).await;
    });

    // 301 Moved Permanently (axum's Redirect helpers emit 303/307/308).
    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, destination)],
    )
        .into_response())
}

/// Best-effort click recording. Re-fetches the link (the resolver only hands
/// back the destination URL, and the insert needs the link id).
async fn record_click(
    state: &AppState,
    code: &str,
    ip: &str,
    user_agent: Option<&str>,
    referer: Option<&str>,
) {
    let link = match state.store.find_by_code(code).await {
        Ok(Some(l)) => l,
        Ok(None) => {
            tracing::warn!("click logging: link '{}' vanished between redirect and log", code);
            return;
        }
        Err(e) => {
            tracing::error!("click logging lookup failed for '{}': {:?}", code, e);
            return;
        }
    };

    if let Err(e) = db::log_click(&state.db, link.id, Some(ip), user_agent, referer).await {
        tracing::error!("failed to record click for '{}': {:?}", code, e);
    }
}
