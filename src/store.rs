use crate::models::ShortLink;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a [`LinkStore`].
///
/// `Duplicate` is raised if and only if the store rejected an insert because
/// the short code already exists. The allocator treats it as a retryable
/// collision; every other failure propagates immediately.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("short code already exists")]
    Duplicate,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for the allocate / resolve core.
///
/// The production implementation is [`crate::db::SqliteStore`]; tests use
/// in-memory stubs to script collisions and count store calls.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new mapping. The store's uniqueness constraint on the short
    /// code is the sole arbiter of collisions; no pre-check is performed.
    async fn insert(&self, short_code: &str, destination_url: &str)
        -> Result<ShortLink, StoreError>;

    /// Fetch a link by its short code. Reads cannot collide, so failures are
    /// plain database errors.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortLink>, sqlx::Error>;
}
