use std::{sync::Arc, time::Duration};

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod resolver;
pub mod shortener;
pub mod store;

use cache::LinkCache;
use db::SqliteStore;
use rate_limit::RateLimiter;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub store: SqliteStore,
    pub config: config::AppConfig,
    /// Bounded redirect cache, created at startup and owned here; the
    /// resolver receives it explicitly rather than reaching into a global.
    pub cache: LinkCache,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: config::AppConfig) -> Self {
        let cache = LinkCache::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            store: SqliteStore::new(db.clone()),
            db,
            config,
            cache,
        }
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

/// Build the full HTTP surface. Admission control wraps the business routes
/// with separate limits: writes are throttled harder than reads.
pub fn build_router(state: Arc<AppState>) -> Router {
    let shorten_limiter = Arc::new(RateLimiter::per_minute(state.config.shorten_rate_per_min));
    let read_limiter = Arc::new(RateLimiter::per_minute(state.config.redirect_rate_per_min));

    let writes = Router::new()
        .route("/shorten", post(handlers::shorten::shorten))
        .route_layer(middleware::from_fn_with_state(
            shorten_limiter,
            rate_limit::admission,
        ));

    let reads = Router::new()
        .route("/analytics/:code", get(handlers::analytics::analytics))
        // Short-link redirect — must come LAST so fixed paths take priority.
        .route("/:code", get(handlers::redirect::redirect))
        .route_layer(middleware::from_fn_with_state(
            read_limiter,
            rate_limit::admission,
        ));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(writes)
        .merge(reads)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .max_age(Duration::from_secs(3600)),
        )
}
