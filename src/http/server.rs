//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Result;

/// HTTP server fronting the rate limited router.
pub struct HttpServer {
    /// Bound listener
    listener: TcpListener,
    /// The router to serve
    router: Router,
}

impl HttpServer {
    /// Bind the server to `addr`.
    pub async fn bind(addr: SocketAddr, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, router })
    }

    /// The address the server is actually listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves. Peer
    /// addresses are exposed to the middleware through `ConnectInfo`.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Starting HTTP server");

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{app_router, IdentityPolicy, RateLimitState};
    use crate::ratelimit::{RateLimitConfig, SlidingWindowLimiter};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_and_limits_by_peer_address() {
        let config = RateLimitConfig::new(Duration::from_secs(60), 1);
        let limiter = Arc::new(SlidingWindowLimiter::new(config).unwrap());
        let router = app_router(RateLimitState::new(Arc::clone(&limiter), IdentityPolicy::default()));

        let server = tokio_test::assert_ok!(HttpServer::bind("127.0.0.1:0".parse().unwrap(), router).await);
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(async {
            let _ = shutdown_rx.await;
        }));

        let first = get(addr, "/items").await;
        assert!(first.starts_with("HTTP/1.1 200"), "unexpected response: {first}");

        let second = get(addr, "/items").await;
        assert!(second.starts_with("HTTP/1.1 429"), "unexpected response: {second}");
        assert!(second.contains("\"timeUnit\":\"milliseconds\""));

        // The key was derived from the loopback peer address
        assert_eq!(limiter.log_len("127.0.0.1", "/items"), Some(1));

        shutdown_tx.send(()).unwrap();
        tokio_test::assert_ok!(handle.await.unwrap());
    }
}
