use crate::{
    error::AppError,
    models::ShortLink,
    store::{LinkStore, StoreError},
};
use rand::{distributions::Alphanumeric, Rng};
use url::Url;

/// Retry cap for collision handling. With 62^8 possible codes, exhausting
/// this means the RNG is broken or the keyspace is close to full — we fail
/// the request rather than silently widening the code.
pub const MAX_ATTEMPTS: u32 = 5;

/// Fixed width of every generated short code.
pub const CODE_LENGTH: usize = 8;

/// Longest destination URL we accept.
pub const MAX_URL_LENGTH: usize = 2048;

/// Allocate a short code for `destination_url` and durably record the mapping.
///
/// Collisions are detected by the store's uniqueness constraint, not by a
/// read-before-write: each attempt inserts a freshly generated code and a
/// `Duplicate` outcome simply triggers the next attempt. Exactly one row
/// exists on success; none of the failure paths leave a row behind.
pub async fn allocate(
    store: &impl LinkStore,
    destination_url: &str,
) -> Result<ShortLink, AppError> {
    validate_url(destination_url)?;

    for attempt in 1..=MAX_ATTEMPTS {
        let code = generate_code();

        match store.insert(&code, destination_url).await {
            Ok(link) => {
                tracing::info!("shortened {} -> {}", destination_url, link.short_code);
                return Ok(link);
            }
            Err(StoreError::Duplicate) => {
                tracing::warn!(
                    "short code collision on attempt {} of {}",
                    attempt,
                    MAX_ATTEMPTS
                );
            }
            Err(StoreError::Database(e)) => return Err(AppError::Storage(e)),
        }
    }

    Err(AppError::CodeSpaceExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Accept only well-formed absolute http(s) URLs within the length bound.
fn validate_url(raw: &str) -> Result<(), AppError> {
    if raw.is_empty() {
        return Err(AppError::InvalidUrl("URL must not be empty".into()));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(AppError::InvalidUrl(format!(
            "URL exceeds {MAX_URL_LENGTH} characters"
        )));
    }

    let parsed =
        Url::parse(raw).map_err(|e| AppError::InvalidUrl(format!("{raw}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::InvalidUrl(format!(
                "unsupported scheme '{other}' (expected http or https)"
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(AppError::InvalidUrl(format!("{raw}: missing host")));
    }

    Ok(())
}

/// Generate a random alphanumeric code of [`CODE_LENGTH`] characters.
///
/// Uses the thread-local RNG so concurrent allocations never serialize on a
/// shared generator; uniqueness is the store's job, not ours.
fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted store: reports a collision for the first `collisions` inserts,
    /// then succeeds, while counting every call.
    struct ScriptedStore {
        collisions: u32,
        insert_calls: AtomicU32,
    }

    impl ScriptedStore {
        fn new(collisions: u32) -> Self {
            Self {
                collisions,
                insert_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LinkStore for ScriptedStore {
        async fn insert(
            &self,
            short_code: &str,
            destination_url: &str,
        ) -> Result<ShortLink, StoreError> {
            let n = self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if n < self.collisions {
                return Err(StoreError::Duplicate);
            }
            Ok(ShortLink {
                id: i64::from(n) + 1,
                short_code: short_code.to_owned(),
                destination_url: destination_url.to_owned(),
                created_at: Utc::now().naive_utc(),
            })
        }

        async fn find_by_code(&self, _short_code: &str) -> Result<Option<ShortLink>, sqlx::Error> {
            Ok(None)
        }
    }

    /// Store that always fails with a non-collision error.
    struct BrokenStore;

    #[async_trait]
    impl LinkStore for BrokenStore {
        async fn insert(
            &self,
            _short_code: &str,
            _destination_url: &str,
        ) -> Result<ShortLink, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_by_code(&self, _short_code: &str) -> Result<Option<ShortLink>, sqlx::Error> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn allocates_on_first_attempt() {
        let store = ScriptedStore::new(0);
        let link = allocate(&store, "https://example.com/path?q=1").await.unwrap();

        assert_eq!(link.destination_url, "https://example.com/path?q=1");
        assert_eq!(link.short_code.len(), CODE_LENGTH);
        assert!(link.short_code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_through_collisions_then_stops() {
        // 3 collisions, success on the 4th generated code.
        let store = ScriptedStore::new(3);
        let link = allocate(&store, "https://example.com").await.unwrap();

        assert_eq!(link.short_code.len(), CODE_LENGTH);
        // Exactly 4 insert calls: no extra store traffic after success.
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhaustion_after_max_attempts() {
        let store = ScriptedStore::new(MAX_ATTEMPTS);
        let err = allocate(&store, "https://example.com").await.unwrap_err();

        assert!(matches!(
            err,
            AppError::CodeSpaceExhausted {
                attempts: MAX_ATTEMPTS
            }
        ));
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_collision_store_error_is_not_retried() {
        let err = allocate(&BrokenStore, "https://example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected_without_store_calls() {
        let store = ScriptedStore::new(0);

        for bad in ["", "not-a-url", "ftp://x.com", "http://"] {
            let err = allocate(&store, bad).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidUrl(_)), "accepted {bad:?}");
        }

        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        let err = allocate(&store, &long).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidUrl(_)));

        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_urls_are_accepted() {
        for good in [
            "https://example.com/path?q=1",
            "http://example.com",
            "https://sub.example.co.uk:8443/a/b#frag",
        ] {
            let store = ScriptedStore::new(0);
            assert!(allocate(&store, good).await.is_ok(), "rejected {good:?}");
        }
    }

    #[test]
    fn generated_codes_are_fixed_width_alphanumeric() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
