//! Request observability for axum services.
//!
//! Structured access logging and panic recovery middleware on top of a
//! configurable `tracing` sink stack (rotating JSON file + console).

pub mod config;
pub mod http;
pub mod observability;

pub use config::AppConfig;
pub use http::{AccessLogLayer, AppError, HttpServer, RecoveryLayer};
pub use observability::{initialize, Logger, LoggingError};
