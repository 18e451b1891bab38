//! Anti-abuse middleware for the WebSocket endpoint
//!
//! Keeps casual scripting off the signaling port: blocks CLI/crawler user
//! agents, requires the headers a real browser upgrade carries, and applies
//! a windowed per-client rate limit. This is transport hygiene, not
//! authorization; room membership stays open by design.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Browsers always send this on a WebSocket upgrade; curl does not.
const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";

/// Windowed request counter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// key -> (request count, window start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Count one request against `key`. False means the window is exhausted.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Drop entries whose window expired a while ago. Run periodically.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

#[derive(Debug, Clone)]
pub struct AbuseConfig {
    pub block_user_agents: bool,
    pub require_browser_headers: bool,
    /// None disables rate limiting.
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            block_user_agents: true,
            require_browser_headers: true,
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

impl AbuseConfig {
    /// Load config from environment variables (ABUSE_BLOCK_USER_AGENTS,
    /// ABUSE_REQUIRE_BROWSER, ABUSE_RATE_LIMIT, ABUSE_RATE_LIMIT_MAX,
    /// ABUSE_RATE_LIMIT_WINDOW).
    pub fn from_env() -> Self {
        let enabled = |key: &str| {
            std::env::var(key)
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true)
        };

        let block_user_agents = enabled("ABUSE_BLOCK_USER_AGENTS");
        let require_browser_headers = enabled("ABUSE_REQUIRE_BROWSER");

        let rate_limiter = if enabled("ABUSE_RATE_LIMIT") {
            let max_requests = std::env::var("ABUSE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            let window_secs = std::env::var("ABUSE_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);
            Some(RateLimiter::new(
                max_requests,
                Duration::from_secs(window_secs),
            ))
        } else {
            None
        };

        tracing::info!(
            block_user_agents,
            require_browser_headers,
            rate_limit_enabled = rate_limiter.is_some(),
            "Anti-abuse config loaded"
        );

        Self {
            block_user_agents,
            require_browser_headers,
            rate_limiter,
        }
    }
}

fn is_blocked_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    if ua.contains("curl")
        || ua.contains("wget")
        || ua.contains("httpie")
        || ua.contains("python-requests")
        || ua.contains("python-urllib")
        || ua.contains("go-http-client")
        || ua.contains("java/")
    {
        return true;
    }
    // "bot" only as a suffix or word, so usernames like "botanica" in a UA
    // comment don't trip it.
    ua.ends_with("bot")
        || ua.contains("bot/")
        || ua.contains("bot ")
        || ua.contains("spider")
        || ua.contains("crawler")
}

/// Rate-limit key: first hop of X-Forwarded-For. Absent behind no proxy, in
/// which case limiting is skipped for that request.
fn rate_limit_key(request: &Request<Body>) -> Option<String> {
    let forwarded = request.headers().get("x-forwarded-for")?.to_str().ok()?;
    let client = forwarded.split(',').next()?.trim();
    if client.is_empty() {
        None
    } else {
        Some(format!("ip:{client}"))
    }
}

/// A real browser upgrade carries both the WebSocket key and an Origin.
fn is_browser_websocket(request: &Request<Body>) -> bool {
    request.headers().contains_key(SEC_WEBSOCKET_KEY)
        && request.headers().contains_key(header::ORIGIN)
}

fn forbidden(message: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(message.to_string()))
        .unwrap()
}

fn rate_limited() -> Response<Body> {
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::RETRY_AFTER, "10")
        .body(Body::from("Rate limit exceeded. Please slow down."))
        .unwrap()
}

/// Middleware guarding the WebSocket upgrade route.
pub async fn ws_abuse_middleware(
    State(config): State<Arc<AbuseConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if config.block_user_agents {
        match request.headers().get(header::USER_AGENT) {
            Some(ua) => {
                if let Ok(ua_str) = ua.to_str() {
                    if is_blocked_user_agent(ua_str) {
                        tracing::warn!(user_agent = ua_str, "Blocked suspicious user agent");
                        return forbidden("Access denied");
                    }
                }
            }
            None => {
                tracing::warn!("Blocked request with no User-Agent");
                return forbidden("Access denied");
            }
        }
    }

    if config.require_browser_headers && !is_browser_websocket(&request) {
        tracing::warn!(
            uri = %request.uri(),
            "Blocked non-browser WebSocket request"
        );
        return forbidden("Access denied");
    }

    if let Some(ref rate_limiter) = config.rate_limiter {
        if let Some(key) = rate_limit_key(&request) {
            if !rate_limiter.check(&key).await {
                tracing::warn!(key, "Rate limited");
                return rate_limited();
            }
        }
    }

    next.run(request).await
}
