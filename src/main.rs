//! ParkNet feedback service - process bootstrap.
//!
//! Startup sequence: initialize structured logging, load configuration
//! (refusing to start without a store URL), open the MongoDB store, then
//! serve the router until a termination signal arrives. Shutdown drains
//! in-flight requests before closing the store connection.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use parknet_feedback::config::AppConfig;
use parknet_feedback::gatekeeper::{PerIpRateLimiter, RateLimiterConfig};
use parknet_feedback::routes;
use parknet_feedback::state::AppState;
use parknet_feedback::store::FeedbackStore;

/// Configuration for the HTTP server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on (default: 3001, or PORT env var)
    #[arg(short, long, env = "PORT", default_value_t = parknet_feedback::config::DEFAULT_PORT)]
    port: u16,

    /// Bind address (default: 0.0.0.0)
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Non-blocking writer so logging never stalls the runtime; the guard
    // must live for the whole program so buffered lines are flushed.
    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(reason = %e, "Invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let store = match FeedbackStore::open(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(reason = %e, "Failed to open MongoDB store, refusing to start");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_listeners(shutdown.clone());

    let rate_limiter = Arc::new(PerIpRateLimiter::new(RateLimiterConfig::from(
        config.as_ref(),
    )));
    rate_limiter.spawn_cleanup_task(shutdown.clone());

    let state = AppState::new(store.clone(), config.clone(), rate_limiter);
    let app = routes::router(state);

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        environment = config.environment.as_str(),
        rate_limit_max = config.rate_limit_max,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        "ParkNet feedback service listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            info!("Shutdown signal received, draining in-flight requests");
        }
    })
    .await?;

    store.close().await;
    Ok(())
}

/// Trigger the shared shutdown token on SIGINT or SIGTERM.
fn spawn_signal_listeners(shutdown: CancellationToken) {
    let sigint = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                sigint.cancel();
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown");
                shutdown.cancel();
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
            }
        }
    });
}
