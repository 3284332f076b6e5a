//! Demo service for the request observability middleware.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ access log ─▶ recovery ─▶ handler
//!                         │            │
//!                         ▼            ▼
//!                  ┌──────────────────────────┐
//!                  │ Logger (EnvFilter)       │
//!                  │  ├─ JSON → rotating file │
//!                  │  └─ text → stdout (dev)  │
//!                  └──────────────────────────┘
//! ```
//!
//! Routes:
//! - `GET /health` answers `ok`
//! - `GET /fail` returns a handler error
//! - `GET /panic` panics inside the handler
//! - `GET /hangup` panics as if the client connection had been reset

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use request_observability::config::{load_config, AppConfig};
use request_observability::observability::initialize;
use request_observability::{AppError, HttpServer};

#[derive(Parser)]
#[command(name = "request-observability")]
#[command(about = "Demo server for access logging and panic recovery", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind.to_string();
    }

    // A logger that cannot write is fatal: refuse to start.
    let logger = Arc::new(initialize(&config.logging)?);
    logger.install_global()?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        log_file = %config.logging.file_path.display(),
        mode = ?config.logging.mode,
        include_stack = config.recovery.include_stack,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let server = HttpServer::new(config, logger, demo_routes());
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fail", get(fail))
        .route("/panic", get(explode))
        .route("/hangup", get(hangup))
}

async fn health() -> &'static str {
    "ok"
}

async fn fail() -> Result<&'static str, AppError> {
    Err(AppError::new(StatusCode::BAD_REQUEST, "demo handler error").with_public_message("bad request"))
}

async fn explode() -> &'static str {
    panic!("demo handler panic");
}

async fn hangup() -> &'static str {
    std::panic::panic_any(io::Error::new(
        io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ));
}
