//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! LoggerConfig
//!     → logging.rs (filter + sinks → Logger handle)
//!         → format.rs (JSON lines for the file sink)
//!         → retention.rs (age cleanup of rotated files)
//!
//! Producers (via Arc<Logger>):
//!     → access log middleware (one INFO record per request)
//!     → recovery middleware (one ERROR record per panic)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Console output only in development mode
//! - Rotation is delegated to the file sink

pub mod format;
pub mod logging;
pub mod retention;

pub use logging::{initialize, Logger, LoggingError};
