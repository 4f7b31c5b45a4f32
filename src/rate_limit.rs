//! Per-client request rate limiting.
//!
//! Fixed-window limiter: each client identity gets a counter that resets
//! when its window elapses. State lives in process memory only and is lost
//! on restart.
//!
//! Client identity is the first comma-separated `X-Forwarded-For` entry
//! when the header is present, otherwise the transport remote address.
//! The forwarded header is trusted unconditionally; see DESIGN.md D1.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;
use serde_json::json;

use crate::state::AppState;

/// Fixed rejection message for over-limit clients.
const REJECTION_MESSAGE: &str = "Too many requests, please try again later";

const HEADER_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter state for one client identity within the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Outcome of admitting one request.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's current window expires.
    pub reset_after: Duration,
}

/// Fixed-window rate limiter keyed by client identity.
///
/// The map is mutex-guarded so admission stays correct under the
/// multi-threaded runtime; the lock is held only for the map operation.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Register one request from `identity` and decide whether to admit it.
    pub fn check(&self, identity: &str) -> Decision {
        self.check_at(identity, Instant::now())
    }

    /// Timestamp-parameterized admission, so window expiry is testable
    /// without sleeping.
    fn check_at(&self, identity: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock();

        let window = windows
            .entry(identity.to_string())
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        if now.duration_since(window.started_at) >= self.window {
            window.count = 0;
            window.started_at = now;
        }

        window.count += 1;

        let elapsed = now.duration_since(window.started_at);
        Decision {
            allowed: window.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }
}

/// Resolve the rate-limit identity for a request.
///
/// First `X-Forwarded-For` entry (trimmed) when present, else the remote
/// address, else a shared bucket for transports without one.
pub fn client_identity(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admission middleware: short-circuits over-limit requests with the fixed
/// 429 envelope and stamps `RateLimit-*` headers on every response.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(&request);
    let decision = state.limiter.check(&identity);

    if !decision.allowed {
        tracing::warn!(client = %identity, "rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "success": false, "error": REJECTION_MESSAGE })),
        )
            .into_response();
        stamp_headers(&mut response, decision);
        response
            .headers_mut()
            .insert(RETRY_AFTER, seconds_value(decision.reset_after));
        return response;
    }

    let mut response = next.run(request).await;
    stamp_headers(&mut response, decision);
    response
}

fn stamp_headers(response: &mut Response, decision: Decision) {
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, number_value(decision.limit));
    headers.insert(HEADER_REMAINING, number_value(decision.remaining));
    headers.insert(HEADER_RESET, seconds_value(decision.reset_after));
}

fn number_value(n: u32) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).expect("numeric header value")
}

fn seconds_value(duration: Duration) -> HeaderValue {
    HeaderValue::from_str(&duration.as_secs().to_string()).expect("numeric header value")
}
