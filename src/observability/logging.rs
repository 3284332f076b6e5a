//! Structured logging.
//!
//! # Responsibilities
//! - Build the sink stack (rotating JSON file, optional console)
//! - Produce the process-wide `Logger` handle
//! - Optionally install it as the global `tracing` default
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for the file, human-readable format for the console
//! - The handle is injected into middleware instead of read from a global
//! - Records are written and flushed on the calling thread; rotated archives
//!   are settled before the write that triggered rotation returns

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use logroller::{LogRoller, LogRollerBuilder, Rotation, RotationSize};
use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogMode, LoggerConfig};
use crate::observability::format::JsonLines;
use crate::observability::retention;

const SECS_PER_DAY: u64 = 86_400;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Errors raised while setting up the logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log sink {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open rotating log file {}: {reason}", path.display())]
    Rotation { path: PathBuf, reason: String },

    #[error("invalid log level '{directive}': {source}")]
    InvalidLevel {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("a process-wide logger is already installed")]
    AlreadyInstalled,
}

/// Handle to the configured sink stack.
///
/// Built once at startup and shared read-only (usually as `Arc<Logger>`).
pub struct Logger {
    dispatch: Dispatch,
    mode: LogMode,
}

impl Logger {
    /// Build a logger over arbitrary writers.
    ///
    /// `file` receives JSON lines. `console` receives human-readable lines and
    /// is only attached in development mode.
    pub fn from_writers<F, C>(
        config: &LoggerConfig,
        file: F,
        console: Option<C>,
    ) -> Result<Self, LoggingError>
    where
        F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
        C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = parse_level(&config.level)?;
        Ok(Self::with_filter(config, filter, file, console))
    }

    fn with_filter<F, C>(config: &LoggerConfig, filter: EnvFilter, file: F, console: Option<C>) -> Self
    where
        F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
        C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let file_layer = fmt::layer().event_format(JsonLines).with_writer(file);

        let console_layer = console
            .filter(|_| config.mode == LogMode::Development)
            .map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(config.console_ansi)
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true)
            });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer);

        Self {
            dispatch: Dispatch::new(subscriber),
            mode: config.mode,
        }
    }

    /// Run `f` with this logger as the current `tracing` dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this logger the global default for the rest of the process.
    ///
    /// Fails if any global subscriber was installed before.
    pub fn install_global(&self) -> Result<(), LoggingError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LoggingError::AlreadyInstalled)
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("mode", &self.mode).finish_non_exhaustive()
    }
}

/// Open the configured sinks and build the logger.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
pub fn initialize(config: &LoggerConfig) -> Result<Logger, LoggingError> {
    let (sink, pruned) = open_file_sink(config)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_level(&config.level)?,
    };

    let console = (config.mode == LogMode::Development).then_some(io::stdout as fn() -> io::Stdout);

    let directory = sink.directory.clone();
    let logger = Logger::with_filter(config, filter, Mutex::new(sink), console);
    report_startup_prune(&logger, &directory, pruned);
    Ok(logger)
}

fn parse_level(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|source| LoggingError::InvalidLevel {
        directive: directive.to_string(),
        source,
    })
}

/// Log the outcome of the age cleanup done before the sink existed.
fn report_startup_prune(logger: &Logger, directory: &Path, pruned: io::Result<usize>) {
    logger.in_scope(|| match pruned {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, directory = %directory.display(), "Pruned expired log files"),
        Err(e) => tracing::warn!(error = %e, directory = %directory.display(), "Failed to prune expired log files"),
    });
}

fn open_file_sink(config: &LoggerConfig) -> Result<(RollingFile, io::Result<usize>), LoggingError> {
    let path = &config.file_path;
    let sink_error = |source: io::Error| LoggingError::Sink {
        path: path.clone(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            sink_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "log path must end in a UTF-8 file name",
            ))
        })?;
    let directory_str = directory.to_str().ok_or_else(|| {
        sink_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log directory must be valid UTF-8",
        ))
    })?;

    fs::create_dir_all(&directory).map_err(sink_error)?;

    let max_age = Duration::from_secs(config.max_age_days.saturating_mul(SECS_PER_DAY));
    let pruned = retention::prune_expired(&directory, file_name, max_age);

    let active_bytes = fs::metadata(path).map_or(0, |m| m.len());
    let roller = LogRollerBuilder::new(directory_str, file_name)
        .rotation(Rotation::SizeBased(RotationSize::MB(config.max_size_mb)))
        .max_keep_files(config.max_backups)
        .graceful_shutdown(true)
        .build()
        .map_err(|e| LoggingError::Rotation {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let sink = RollingFile {
        roller,
        directory,
        file_name: file_name.to_string(),
        max_age,
        threshold: config.max_size_mb.saturating_mul(BYTES_PER_MB),
        active_bytes,
    };
    Ok((sink, pruned))
}

/// Size-rotated log file that also enforces the maximum backup age.
///
/// Every write is flushed. With graceful shutdown enabled the roller settles
/// its archives (shift and count pruning) inside that flush, so expired
/// backups can be removed right after the write that rotated.
struct RollingFile {
    roller: LogRoller,
    directory: PathBuf,
    file_name: String,
    max_age: Duration,
    threshold: u64,
    /// Bytes in the active file, tracked with the roller's own rollover rule.
    active_bytes: u64,
}

impl RollingFile {
    fn prune(&self) -> io::Result<()> {
        retention::prune_expired(&self.directory, &self.file_name, self.max_age)
            .map(|_| ())
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot prune expired logs in {}: {e}", self.directory.display()),
                )
            })
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let rotates = self.active_bytes.saturating_add(buf.len() as u64) >= self.threshold;

        let written = self.roller.write(buf)?;
        self.roller.flush()?;

        if rotates {
            self.active_bytes = written as u64;
            // The record is already on disk; a cleanup failure surfaces
            // through the subscriber's internal error reporting.
            self.prune()?;
        } else {
            self.active_bytes = self.active_bytes.saturating_add(written as u64);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.roller.flush()
    }
}
