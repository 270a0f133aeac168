//! Axum middleware that applies the limiter ahead of application routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{info, instrument, trace};

use super::client_ip::{client_identity, IdentityPolicy};
use super::response::RateLimited;
use crate::ratelimit::{Decision, LogStore, ShardedLogStore, SlidingWindowLimiter};

/// Shared state handed to [`rate_limit_middleware`].
pub struct RateLimitState<S: LogStore = ShardedLogStore> {
    /// The limiter instance
    limiter: Arc<SlidingWindowLimiter<S>>,
    /// Client identity derivation rules
    policy: IdentityPolicy,
}

impl<S: LogStore> Clone for RateLimitState<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            policy: self.policy,
        }
    }
}

impl<S: LogStore + 'static> RateLimitState<S> {
    pub fn new(limiter: Arc<SlidingWindowLimiter<S>>, policy: IdentityPolicy) -> Self {
        Self { limiter, policy }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter<S>> {
        &self.limiter
    }

    /// Put every route of `router` behind the limiter.
    pub fn apply(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self, rate_limit_middleware::<S>))
    }
}

/// Check the request against the limiter.
///
/// Allowed requests pass to the next service untouched; denied ones are
/// answered with 429 and never reach it. The peer address is read from
/// [`ConnectInfo`] when the server provides it.
#[instrument(
    level = "debug",
    skip_all,
    fields(method = %request.method(), path = %request.uri().path())
)]
pub async fn rate_limit_middleware<S: LogStore + 'static>(
    State(state): State<RateLimitState<S>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_identity(request.headers(), peer, state.policy);
    let path = request.uri().path();

    match state.limiter.check_now(&client, path) {
        Decision::Allow => {
            trace!(client = %client, "Request allowed");
            next.run(request).await
        }
        Decision::Deny { retry_after } => {
            info!(
                client = %client,
                path = %path,
                retry_after_ms = retry_after.as_millis() as u64,
                "Request rejected by rate limiter"
            );
            RateLimited { retry_after }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client_ip::X_FORWARDED_FOR;
    use crate::http::response::RateLimitedBody;
    use crate::ratelimit::{GlobalLockLogStore, RateLimitConfig};
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Duration;
    use tower::ServiceExt;

    fn limited_router(max_requests: u32, policy: IdentityPolicy) -> Router {
        let config = RateLimitConfig::new(Duration::from_secs(60), max_requests);
        let limiter = Arc::new(SlidingWindowLimiter::new(config).unwrap());
        let app = Router::new()
            .route("/foo", get(|| async { "foo" }))
            .route("/bar", get(|| async { "bar" }));
        RateLimitState::new(limiter, policy).apply(app)
    }

    fn request(path: &str, peer: Option<SocketAddr>, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(path);
        if let Some(value) = forwarded {
            builder = builder.header(X_FORWARDED_FOR, value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(addr) = peer {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    fn peer(ip: impl Into<std::net::IpAddr>) -> Option<SocketAddr> {
        Some(SocketAddr::new(ip.into(), 40000))
    }

    async fn status(app: &Router, request: Request) -> StatusCode {
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_allows_until_quota_then_rejects() {
        let app = limited_router(2, IdentityPolicy::default());
        let client = peer(Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(status(&app, request("/foo", client, None)).await, StatusCode::OK);
        assert_eq!(status(&app, request("/foo", client, None)).await, StatusCode::OK);

        let response = app.clone().oneshot(request("/foo", client, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: RateLimitedBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "Too many requests");
        assert_eq!(body.time_unit, "milliseconds");
        assert!(body.retry_after > 59_000 && body.retry_after <= 60_000);
    }

    #[tokio::test]
    async fn test_allowed_response_passes_through() {
        let app = limited_router(1, IdentityPolicy::default());
        let response = app
            .oneshot(request("/foo", peer(Ipv4Addr::new(10, 0, 0, 1)), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"foo");
    }

    #[tokio::test]
    async fn test_paths_and_clients_are_independent() {
        let app = limited_router(1, IdentityPolicy::default());
        let a = peer(Ipv4Addr::new(10, 0, 0, 1));
        let b = peer(Ipv4Addr::new(10, 0, 0, 2));

        assert_eq!(status(&app, request("/foo", a, None)).await, StatusCode::OK);
        assert_eq!(status(&app, request("/bar", a, None)).await, StatusCode::OK);
        assert_eq!(status(&app, request("/foo", b, None)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request("/foo", a, None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_loopback_forms_share_quota() {
        let app = limited_router(1, IdentityPolicy::default());

        assert_eq!(
            status(&app, request("/foo", peer(Ipv6Addr::LOCALHOST), None)).await,
            StatusCode::OK
        );
        assert_eq!(
            status(&app, request("/foo", peer(Ipv4Addr::LOCALHOST), None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_forwarded_header_overrides_peer() {
        let app = limited_router(1, IdentityPolicy::default());
        let proxy_a = peer(Ipv4Addr::new(10, 0, 0, 1));
        let proxy_b = peer(Ipv4Addr::new(10, 0, 0, 2));

        assert_eq!(
            status(&app, request("/foo", proxy_a, Some("203.0.113.7,10.0.0.1"))).await,
            StatusCode::OK
        );
        // Same forwarded client through a different proxy
        assert_eq!(
            status(&app, request("/foo", proxy_b, Some("203.0.113.7"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        // Different forwarded client through the same proxy
        assert_eq!(
            status(&app, request("/foo", proxy_a, Some("198.51.100.2"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_trim_policy_merges_padded_entries() {
        let app = limited_router(
            1,
            IdentityPolicy {
                trim_forwarded_for: true,
            },
        );

        assert_eq!(
            status(&app, request("/foo", None, Some(" 203.0.113.7 ,x"))).await,
            StatusCode::OK
        );
        assert_eq!(
            status(&app, request("/foo", None, Some("203.0.113.7"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_query_string_is_not_part_of_key() {
        let app = limited_router(1, IdentityPolicy::default());
        let client = peer(Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(status(&app, request("/foo?a=1", client, None)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request("/foo?a=2", client, None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_missing_connect_info_uses_empty_identity() {
        let app = limited_router(1, IdentityPolicy::default());

        assert_eq!(status(&app, request("/foo", None, None)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request("/foo", None, None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_global_lock_store_backend() {
        let config = RateLimitConfig::new(Duration::from_secs(60), 1);
        let limiter =
            Arc::new(SlidingWindowLimiter::with_store(config, GlobalLockLogStore::new()).unwrap());
        let state = RateLimitState::new(Arc::clone(&limiter), IdentityPolicy::default());
        let app = state.apply(Router::new().route("/foo", get(|| async { "foo" })));
        let client = peer(Ipv4Addr::new(10, 0, 0, 1));

        assert_eq!(status(&app, request("/foo", client, None)).await, StatusCode::OK);
        assert_eq!(
            status(&app, request("/foo", client, None)).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(limiter.key_count(), 1);
    }
}
