/// Middleware module
///
/// Session gating and rate limiting for the auth surface.

mod rate_limit;
mod session_middleware;

pub use rate_limit::RateLimit;
pub use session_middleware::SessionMiddleware;
