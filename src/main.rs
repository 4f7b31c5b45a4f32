//! practicelog server binary.
//!
//! Startup sequence: bind the listening socket first, log the reachable
//! endpoints, then attempt the database connection after a fixed delay.
//! A failed connect leaves the server running; only persistence-dependent
//! routes degrade.

use std::net::SocketAddr;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use practicelog::database;
use practicelog::{router, AppState, Config};

/// Daily practice submission collector.
#[derive(Parser, Debug)]
#[command(name = "practicelog")]
#[command(about = "Web server collecting daily practice submissions", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load .env file if it exists
    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    practicelog::error::expose_error_details(config.is_development());

    let port = config.port;
    let mode = config.environment.as_str();

    // Create application state and build the router with its pipeline
    let state = AppState::new(config);
    let app = router(state.clone());

    // Phase one: bind and announce
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, mode, "server listening");
    tracing::info!("form page:   http://localhost:{port}/");
    tracing::info!("admin page:  http://localhost:{port}/manage");
    tracing::info!("api probes:  http://localhost:{port}/api/health, http://localhost:{port}/api/test");

    // Phase two: deferred database connect, detached from request serving
    let connect_task = tokio::spawn(database::connect_after_delay(
        state,
        database::CONNECT_DELAY,
    ));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Don't leave the connect timer dangling past shutdown.
    connect_task.abort();
    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        tracing::info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
