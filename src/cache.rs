use moka::future::Cache;
use std::time::Duration;

/// Bounded in-memory cache mapping short_code -> destination_url.
///
/// Backed by moka, so reads are concurrent and entries are evicted on two
/// independent axes: least-recently-used once `max_entries` is reached, and a
/// hard time-to-live measured from insertion. The TTL bounds how stale a
/// cached destination can ever be, even for a hot entry.
///
/// The cache is a projection only — the `links` table stays the source of
/// truth, and only the resolver ever writes here (on a confirmed store hit,
/// never for negative lookups).
#[derive(Clone, Debug)]
pub struct LinkCache {
    inner: Cache<String, String>,
}

impl LinkCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Look up a short code. Returns a clone of the destination URL if a live
    /// entry is present.
    pub async fn get(&self, short_code: &str) -> Option<String> {
        self.inner.get(short_code).await
    }

    /// Insert or refresh a mapping.
    pub async fn set(&self, short_code: impl Into<String>, destination_url: impl Into<String>) {
        self.inner
            .insert(short_code.into(), destination_url.into())
            .await;
    }

    /// Number of entries currently cached (approximate under concurrency).
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }
}
