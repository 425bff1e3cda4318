//! Fixed-window rate limiting per client IP.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::response::RelayError;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter for one client's current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset_after: Duration },
    Limited { retry_after: Duration },
}

/// Counts requests per key in fixed windows.
///
/// A key's window opens on its first request and lasts `window`. Once
/// `max_requests` have been counted, further requests are refused until the
/// window ends.
pub struct FixedWindowLimiter {
    windows: DashMap<IpAddr, Window>,
    window: Duration,
    max_requests: u32,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn check(&self, key: IpAddr) -> Decision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: IpAddr, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key).or_insert(Window { started: now, count: 0 });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        let reset_after = self.window.saturating_sub(now.saturating_duration_since(entry.started));

        if entry.count >= self.max_requests {
            Decision::Limited { retry_after: reset_after }
        } else {
            entry.count += 1;
            Decision::Allowed {
                remaining: self.max_requests - entry.count,
                reset_after,
            }
        }
    }

    /// Drop windows that have ended. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// State for the rate limit middleware.
pub struct RateLimiterState {
    limiter: FixedWindowLimiter,
    trust_forwarded_for: bool,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limiter: FixedWindowLimiter::new(
                Duration::from_secs(config.window_secs),
                config.max_requests,
            ),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    fn client_ip(&self, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
        if self.trust_forwarded_for {
            if let Some(ip) = forwarded_for(headers) {
                return ip;
            }
        }
        peer.ip()
    }
}

/// First address of `X-Forwarded-For`, the original client.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Middleware function for fixed-window rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = state.client_ip(request.headers(), addr);

    match state.limiter.check(client) {
        Decision::Allowed { remaining, reset_after } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(state.limiter.max_requests()));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
            response
        }
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %client, "Rate limit exceeded");
            let retry_after_secs = ceil_secs(retry_after);
            let mut response = RelayError::RateLimited { retry_after_secs }.into_response();
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(state.limiter.max_requests()));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(retry_after_secs));
            response
        }
    }
}
