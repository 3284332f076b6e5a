//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info)
//!     → middleware/ (access log → recovery)
//!     → application handler
//!         → errors.rs (AppError / HandlerErrors on the response)
//!     → Send to client
//! ```

pub mod client_ip;
pub mod dump;
pub mod errors;
pub mod middleware;
pub mod server;

pub use errors::{AppError, HandlerErrors};
pub use middleware::{AccessLogLayer, RecoveryLayer, RequestAborted};
pub use server::HttpServer;
