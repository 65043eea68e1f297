//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::extract_client_ip;
use crate::cli::IpExtractor;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default number of login attempts an IP can make in a burst.
pub const DEFAULT_LOGIN_BURST: u32 = 5;

#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts (one per second, bursting to `burst`)
    pub login: Arc<IpLimiter>,
    /// Trusted proxy header for the client IP, `None` uses the socket address
    pub ip_extractor: Option<IpExtractor>,
}

impl RateLimitConfig {
    pub fn new(login_burst: u32, ip_extractor: Option<IpExtractor>) -> Self {
        let burst = NonZeroU32::new(login_burst).unwrap_or(NonZeroU32::MIN);
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::MIN).allow_burst(burst),
            )),
            ip_extractor,
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_extractor.as_ref()) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(reason, "Rejected login without a client IP");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many authentication attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}
