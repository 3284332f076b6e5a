//! Request middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → access_log.rs (capture start, path, query, client)
//!     → recovery.rs (panic boundary)
//!     → handler
//!     ← recovery.rs (panic → logged + apology / aborted)
//!     ← access_log.rs (one record with final status)
//! ```

pub mod access_log;
pub mod panic;
pub mod recovery;

pub use access_log::{AccessLog, AccessLogLayer, AccessLogRecord};
pub use recovery::{Recovery, RecoveryLayer, RequestAborted};
