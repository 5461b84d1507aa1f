use crate::{cache::LinkCache, error::AppError, store::LinkStore};

/// Resolve a short code to its destination URL, cache-aside.
///
/// The cache is consulted first; on a miss the store is queried and, only if
/// the code exists, the cache is populated for subsequent reads. Unknown codes
/// are never cached — a code that is missing now may be allocated later, and
/// probing must not grow the cache.
///
/// Concurrent misses for the same code may each reach the store. That is
/// deliberate: store reads are idempotent and cheap, so the complexity of
/// single-flight deduplication buys nothing here.
pub async fn resolve(
    store: &impl LinkStore,
    cache: &LinkCache,
    short_code: &str,
) -> Result<String, AppError> {
    if let Some(url) = cache.get(short_code).await {
        tracing::debug!("cache hit for '{}'", short_code);
        return Ok(url);
    }

    match store.find_by_code(short_code).await {
        Ok(Some(link)) => {
            cache.set(&link.short_code, &link.destination_url).await;
            Ok(link.destination_url)
        }
        Ok(None) => Err(AppError::NotFound),
        Err(e) => Err(AppError::Storage(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortLink;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fixed in-memory store that counts lookups.
    struct CountingStore {
        links: HashMap<String, String>,
        find_calls: AtomicU32,
    }

    impl CountingStore {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                links: entries
                    .iter()
                    .map(|(c, u)| ((*c).to_owned(), (*u).to_owned()))
                    .collect(),
                find_calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.find_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkStore for CountingStore {
        async fn insert(
            &self,
            _short_code: &str,
            _destination_url: &str,
        ) -> Result<ShortLink, StoreError> {
            unimplemented!("resolver tests never insert")
        }

        async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortLink>, sqlx::Error> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.links.get(short_code).map(|url| ShortLink {
                id: 1,
                short_code: short_code.to_owned(),
                destination_url: url.clone(),
                created_at: Utc::now().naive_utc(),
            }))
        }
    }

    fn cache() -> LinkCache {
        LinkCache::new(100, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn miss_populates_cache_and_hit_skips_store() {
        let store = CountingStore::with(&[("abc12345", "https://example.com")]);
        let cache = cache();

        let url = resolve(&store, &cache, "abc12345").await.unwrap();
        assert_eq!(url, "https://example.com");
        assert_eq!(store.calls(), 1);

        // Second resolution within the TTL is served from the cache.
        let url = resolve(&store, &cache, "abc12345").await.unwrap();
        assert_eq!(url, "https://example.com");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_exactly_one_store_call() {
        let store = CountingStore::with(&[("abc12345", "https://example.com")]);
        let cache = LinkCache::new(100, Duration::from_millis(50));

        resolve(&store, &cache, "abc12345").await.unwrap();
        assert_eq!(store.calls(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;

        resolve(&store, &cache, "abc12345").await.unwrap();
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_codes_are_not_negatively_cached() {
        let store = CountingStore::with(&[]);
        let cache = cache();

        for _ in 0..2 {
            let err = resolve(&store, &cache, "missing1").await.unwrap_err();
            assert!(matches!(err, AppError::NotFound));
        }

        // Both resolutions reached the store: no negative caching.
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn code_created_after_a_miss_becomes_resolvable() {
        let cache = cache();

        let empty = CountingStore::with(&[]);
        assert!(resolve(&empty, &cache, "abc12345").await.is_err());

        // Same cache, store now contains the code: the earlier miss must not
        // have poisoned the cache.
        let filled = CountingStore::with(&[("abc12345", "https://example.com")]);
        let url = resolve(&filled, &cache, "abc12345").await.unwrap();
        assert_eq!(url, "https://example.com");
    }
}
