// Middleware module - contains CORS and rate limiting layers

pub mod cors;
pub mod rate_limit;

// Re-export for convenience
pub use cors::create_cors_layer;
pub use rate_limit::{RateLimiterState, create_rate_limiter_with_quota, rate_limit_middleware};
