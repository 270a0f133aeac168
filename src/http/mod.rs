//! HTTP adapter: puts the limiter in front of an axum router.

mod client_ip;
mod middleware;
mod response;
mod routes;
mod server;

pub use client_ip::{client_identity, IdentityPolicy, X_FORWARDED_FOR};
pub use middleware::{rate_limit_middleware, RateLimitState};
pub use response::{RateLimited, RateLimitedBody, RETRY_AFTER_UNIT};
pub use routes::app_router;
pub use server::HttpServer;
