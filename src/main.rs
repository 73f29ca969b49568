//! callscribe - Main entry point
//!
//! Bootstraps configuration, the two backend clients, and the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callscribe::config::Config;
use callscribe::services::{CallPipeline, GeminiClient, SheetsClient};
use callscribe::{build_router, AppState};

/// Command-line arguments for callscribe
#[derive(Parser, Debug)]
#[command(name = "callscribe")]
#[command(about = "Sales-call audio to CRM pipeline service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "CALLSCRIBE_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callscribe=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // All backend settings are required before the pipeline can run
    let config = Config::from_env().context("Failed to load configuration")?;

    let analyzer = Arc::new(GeminiClient::new(config.gemini_api_key));
    let ledger = Arc::new(SheetsClient::new(
        config.sheets_access_token,
        config.spreadsheet_id,
    ));
    let pipeline = Arc::new(CallPipeline::new(analyzer, ledger));

    let state = AppState::new(pipeline);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting callscribe on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
