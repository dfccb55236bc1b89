/// Rate limiting for the HTTP surface
///
/// In-process limiters only; the unauthenticated quota is deliberately
/// tight because it fronts the login and public submission endpoints.
use crate::{api::middleware::extract_session_token, context::AppContext, error::AdminError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for requests carrying a session token
    pub authenticated_rps: u32,
    /// Requests per second for anonymous requests
    pub unauthenticated_rps: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authenticated_rps: 100,
            unauthenticated_rps: 10,
            burst_size: 20,
        }
    }
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    unauthenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let auth_quota = Quota::per_second(
            NonZeroU32::new(config.authenticated_rps).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(20).unwrap()));

        let unauth_quota = Quota::per_second(
            NonZeroU32::new(config.unauthenticated_rps).unwrap_or(NonZeroU32::new(10).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 4).unwrap_or(NonZeroU32::new(5).unwrap()),
        );

        Self {
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
        }
    }

    /// Check the quota for a request; `authenticated` selects which
    /// limiter applies.
    pub fn check(&self, authenticated: bool) -> Result<(), AdminError> {
        let limiter = if authenticated {
            &self.authenticated
        } else {
            &self.unauthenticated
        };

        limiter.check().map_err(|_| AdminError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, AdminError> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(req).await);
    }

    let authenticated = extract_session_token(req.headers()).is_some();
    ctx.rate_limiter.check(authenticated)?;

    Ok(next.run(req).await)
}
