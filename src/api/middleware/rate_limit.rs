//! Rate limiting middleware.
//!
//! Provides rate limiting for API endpoints using the governor crate.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::routes::error::ApiError;
use crate::services::ServiceError;

/// Rate limiter state
pub type RateLimiterState = Arc<
    RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
>;

const DEFAULT_PER_MINUTE: NonZeroU32 = NonZeroU32::MIN.saturating_add(99);

/// Create a rate limiter allowing `requests_per_minute` requests, shared by
/// every caller of the routes it guards. Zero falls back to 100.
pub fn create_rate_limiter_with_quota(requests_per_minute: u32) -> RateLimiterState {
    let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(DEFAULT_PER_MINUTE);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded for request: {}", request.uri());
            Err(ApiError(ServiceError::RateLimited(
                "Too many requests, try again later".to_string(),
            )))
        }
    }
}
