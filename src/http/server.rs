//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the application router with the observability middleware
//! - Bind the router to a listener with peer address info
//! - Serve until a shutdown signal arrives

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::middleware::{AccessLogLayer, RecoveryLayer};
use crate::observability::Logger;

/// HTTP server hosting an application router.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    logger: Arc<Logger>,
}

impl HttpServer {
    /// Create a server around `routes` with the given configuration.
    pub fn new(config: AppConfig, logger: Arc<Logger>, routes: Router) -> Self {
        let router = Self::build_router(&config, logger.clone(), routes);
        Self {
            router,
            config,
            logger,
        }
    }

    /// Apply the middleware stack.
    ///
    /// The access log sits outside recovery so it records the status of the
    /// response recovery produced.
    pub fn build_router(config: &AppConfig, logger: Arc<Logger>, routes: Router) -> Router {
        routes
            .layer(RecoveryLayer::from_config(logger.clone(), &config.recovery))
            .layer(AccessLogLayer::from_config(logger, &config.access_log))
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.logger.in_scope(|| {
            tracing::info!(
                address = %addr,
                mode = ?self.logger.mode(),
                "HTTP server starting"
            )
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.logger.in_scope(|| tracing::info!("HTTP server stopped"));
        Ok(())
    }

    /// Get the router with middleware applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
