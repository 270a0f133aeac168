use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;

use slidegate::config::SlidegateConfig;
use slidegate::http::{app_router, HttpServer, IdentityPolicy, RateLimitState};
use slidegate::ratelimit::{SlidingWindowLimiter, Sweeper};
use slidegate::telemetry;

/// Sliding-window rate limiting gateway.
#[derive(Parser, Debug)]
#[command(name = "slidegate", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Maximum requests per client and path within one window
    #[arg(long)]
    max_requests: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = SlidegateConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.http_addr = listen;
    }
    if let Some(window_ms) = args.window_ms {
        config.rate_limiting.window_ms = window_ms;
    }
    if let Some(max_requests) = args.max_requests {
        config.rate_limiting.max_requests = max_requests;
    }
    config.validate()?;

    telemetry::init_tracing(&config.logging);

    info!("Starting Slidegate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        http_addr = %config.server.http_addr,
        window_ms = config.rate_limiting.window_ms,
        max_requests = config.rate_limiting.max_requests,
        "Configuration loaded"
    );

    let limiter = Arc::new(SlidingWindowLimiter::new(
        config.rate_limiting.limiter_config(),
    )?);

    let sweeper = config
        .rate_limiting
        .sweep_interval()
        .map(|interval| Sweeper::spawn(Arc::clone(&limiter), interval));

    let policy = IdentityPolicy {
        trim_forwarded_for: config.rate_limiting.trim_forwarded_for,
    };
    let router = app_router(RateLimitState::new(limiter, policy));

    let server = HttpServer::bind(config.server.http_addr, router).await?;
    server.serve_with_shutdown(shutdown_signal()).await?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    info!("Slidegate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
