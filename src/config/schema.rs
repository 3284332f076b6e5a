//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration.
    pub server: ServerConfig,

    /// Logger sinks, rotation and verbosity.
    pub logging: LoggerConfig,

    /// Access log middleware settings.
    pub access_log: AccessLogConfig,

    /// Panic recovery middleware settings.
    pub recovery: RecoveryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Output mode of the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// File and console sinks.
    #[default]
    #[serde(alias = "dev")]
    Development,
    /// File sink only.
    #[serde(alias = "prod")]
    Production,
}

/// Logger configuration.
///
/// Immutable once the logger has been initialized.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Path of the active log file. Rotated segments live next to it.
    pub file_path: PathBuf,

    /// Roll over once the active file exceeds this many MiB.
    pub max_size_mb: u64,

    /// Rotated files older than this many days are deleted.
    pub max_age_days: u64,

    /// Number of rotated files to keep.
    pub max_backups: u64,

    /// Verbosity threshold (an `EnvFilter` directive, e.g. "debug" or "info,hyper=warn").
    pub level: String,

    /// Development duplicates every record to the console.
    pub mode: LogMode,

    /// Colorize console output.
    pub console_ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("web_app.log"),
            max_size_mb: 200,
            max_age_days: 30,
            max_backups: 7,
            level: "debug".to_string(),
            mode: LogMode::Development,
            console_ansi: true,
        }
    }
}

/// Access log middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Resolve the client IP from `X-Forwarded-For` / `X-Real-IP` before
    /// falling back to the socket peer.
    pub trust_forwarded_headers: bool,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_headers: true,
        }
    }
}

/// Panic recovery middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Attach a backtrace of the panic site to the panic record.
    pub include_stack: bool,

    /// Status code answered after a generic panic.
    /// Defaults to 200 so clients do not treat the reply as a hard failure.
    pub apology_status: u16,

    /// Body answered after a generic panic.
    pub apology_message: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            include_stack: true,
            apology_status: 200,
            apology_message: "an error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.file_path, PathBuf::from("web_app.log"));
        assert_eq!(config.max_size_mb, 200);
        assert_eq!(config.max_age_days, 30);
        assert_eq!(config.max_backups, 7);
        assert_eq!(config.mode, LogMode::Development);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [logging]
            mode = "prod"
            level = "info"

            [recovery]
            include_stack = false
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.mode, LogMode::Production);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_backups, 7);
        assert!(!config.recovery.include_stack);
        assert_eq!(config.recovery.apology_status, 200);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_mode_spellings() {
        let dev: LogMode = serde_json::from_str("\"development\"").unwrap();
        let dev_short: LogMode = serde_json::from_str("\"dev\"").unwrap();
        let prod: LogMode = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(dev, LogMode::Development);
        assert_eq!(dev_short, LogMode::Development);
        assert_eq!(prod, LogMode::Production);
    }
}
