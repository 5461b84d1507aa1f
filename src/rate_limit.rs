use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::Instant,
};

// ── Token buckets ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Admission decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u64 },
    Limited { retry_after_secs: u64 },
}

/// Per-client token-bucket rate limiter.
///
/// Each client key (IP address) gets its own bucket; a request consumes one
/// token and tokens refill continuously at a fixed rate. The bucket map is
/// unbounded, matching the per-IP map in the upstream deployment — entries
/// are tiny and IPs churn slowly relative to process lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(capacity),
            refill_per_sec,
        }
    }

    /// `capacity` requests per minute with continuous refill.
    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, f64::from(capacity) / 60.0)
    }

    /// Try to take one token from `key`'s bucket.
    pub fn try_consume(&self, key: &str) -> Decision {
        let mut bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| Bucket {
                tokens: self.capacity,
                last_refill: Instant::now(),
            });

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed {
                remaining: bucket.tokens as u64,
            }
        } else {
            let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
            Decision::Limited {
                retry_after_secs: wait.ceil() as u64,
            }
        }
    }
}

// ── Middleware ─────────────────────────────────────────────────────────────

/// axum middleware enforcing a [`RateLimiter`] per client IP.
///
/// Allowed requests get an `X-Rate-Limit-Remaining` header; rejected ones get
/// 429 with `X-Rate-Limit-Retry-After-Seconds` and a JSON error body.
pub async fn admission(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers(), addr);

    match limiter.try_consume(&ip) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            if let Ok(value) = remaining.to_string().parse() {
                response.headers_mut().insert("x-rate-limit-remaining", value);
            }
            response
        }
        Decision::Limited { retry_after_secs } => {
            tracing::warn!("rate limit exceeded for IP {} on {}", ip, request.uri().path());

            let body = Json(json!({
                "error": "Too many requests",
                "message": format!(
                    "Rate limit exceeded. Please try again in {retry_after_secs} seconds."
                ),
            }));
            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert("x-rate-limit-retry-after-seconds", value);
            }
            response
        }
    }
}

/// Determine the real client IP, preferring common proxy headers.
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    // X-Forwarded-For can be a comma-separated list; take the first entry.
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = xff.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }

    addr.ip().to_string()
}
