use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::responses::ApiError;
use crate::state::AppState;

const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
const HEADER_RETRY_AFTER: HeaderName = HeaderName::from_static("retry-after");

/// Per-client fixed-window counter. Expired windows are reset lazily on the
/// next hit from that client; a full sweep runs only once the map grows past
/// `sweep_threshold`, so the hot path stays a single shard lock.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window_secs: i64,
    windows: DashMap<String, Window>,
    sweep_threshold: usize,
}

struct Window {
    count: u32,
    reset_unix: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_unix: i64,
    pub retry_after_secs: i64,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window_secs: i64) -> Self {
        FixedWindowLimiter {
            max_requests,
            window_secs,
            windows: DashMap::new(),
            sweep_threshold: 10_000,
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn check_at(&self, key: &str, now_unix: i64) -> RateLimitDecision {
        if self.windows.len() >= self.sweep_threshold {
            self.windows.retain(|_, w| w.reset_unix > now_unix);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            reset_unix: now_unix + self.window_secs,
        });
        if entry.reset_unix <= now_unix {
            entry.count = 0;
            entry.reset_unix = now_unix + self.window_secs;
        }
        // Rejected requests still count; hammering a closed window does not
        // shorten the wait.
        entry.count += 1;

        RateLimitDecision {
            allowed: entry.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_unix: entry.reset_unix,
            retry_after_secs: (entry.reset_unix - now_unix).max(0),
        }
    }
}

/// Clients behind a proxy are identified by the first `X-Forwarded-For` hop;
/// otherwise by the peer address.
fn client_key(request: &Request, addr: &SocketAddr) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn apply_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    let pairs = [
        (HEADER_LIMIT, decision.limit.to_string()),
        (HEADER_REMAINING, decision.remaining.to_string()),
        (HEADER_RESET, decision.reset_unix.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

pub async fn rate_limit(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request, &addr);
    let decision = app_state.limiter.check(&key);

    if !decision.allowed {
        let mut response = ApiError::too_many_requests(&format!(
            "Rate limit exceeded. Try again in {} seconds.",
            decision.retry_after_secs
        ));
        apply_headers(&mut response, &decision);
        if let Ok(value) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
            response.headers_mut().insert(HEADER_RETRY_AFTER, value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}
