use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./miniurl.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when generating short links, e.g. "https://go.example.com"
    /// Must NOT have a trailing slash.
    pub base_url: String,

    /// Maximum number of entries the redirect cache holds before LRU eviction
    pub cache_max_entries: u64,

    /// Seconds a cached redirect stays live, regardless of access recency
    pub cache_ttl_secs: u64,

    /// Per-IP rate limit for POST /shorten (requests per minute)
    pub shorten_rate_per_min: u32,

    /// Per-IP rate limit for redirects and analytics reads (requests per minute)
    pub redirect_rate_per_min: u32,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./miniurl.db".into()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            base_url,
            cache_max_entries: env_parsed("CACHE_MAX_ENTRIES", 10_000),
            cache_ttl_secs: env_parsed("CACHE_TTL_SECS", 3_600),
            shorten_rate_per_min: env_parsed("SHORTEN_RATE_PER_MIN", 20),
            redirect_rate_per_min: env_parsed("REDIRECT_RATE_PER_MIN", 100),
        })
    }

    /// Full public URL for a short code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
