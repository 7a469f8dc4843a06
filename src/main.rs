mod clock;
mod config;
mod deletion;
mod error;
mod handlers;
mod identity;
mod llm;
mod metrics;
mod models;
mod rate_limit;
mod state;
mod store;
mod summary;

use clap::Parser; // for cli
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Args;
use crate::rate_limit::{MAX_REQUESTS_PER_HOUR, MAX_REQUESTS_PER_MINUTE};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    // missing credentials are fatal
    let state = match AppState::from_args(&args) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!("Summary gateway running on http://localhost:{}", args.port);
    info!(
        "Rate limit: {} requests per minute, {} requests per hour",
        MAX_REQUESTS_PER_MINUTE, MAX_REQUESTS_PER_HOUR
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
