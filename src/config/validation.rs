//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges and reports every
//! problem at once rather than stopping at the first.

use std::fmt;
use std::net::SocketAddr;

use axum::http::StatusCode;

use crate::config::schema::AppConfig;

/// Largest rotation threshold whose byte count still fits in a `u64`.
pub const MAX_SIZE_MB: u64 = u64::MAX / (1024 * 1024);

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }

    let logging = &config.logging;
    if logging.file_path.file_name().is_none() {
        errors.push(ValidationError::new(
            "logging.file_path",
            "must name a file",
        ));
    }
    if logging.max_size_mb == 0 {
        errors.push(ValidationError::new("logging.max_size_mb", "must be > 0"));
    } else if logging.max_size_mb > MAX_SIZE_MB {
        errors.push(ValidationError::new(
            "logging.max_size_mb",
            format!("must be <= {MAX_SIZE_MB}"),
        ));
    }
    if logging.max_age_days == 0 {
        errors.push(ValidationError::new("logging.max_age_days", "must be > 0"));
    }
    if logging.max_backups == 0 {
        errors.push(ValidationError::new("logging.max_backups", "must be > 0"));
    }
    if logging.level.trim().is_empty() {
        errors.push(ValidationError::new("logging.level", "must not be empty"));
    }

    if StatusCode::from_u16(config.recovery.apology_status).is_err() {
        errors.push(ValidationError::new(
            "recovery.apology_status",
            format!("{} is not an HTTP status code", config.recovery.apology_status),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.logging.max_size_mb = 0;
        config.logging.max_backups = 0;
        config.recovery.apology_status = 42;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "logging.max_size_mb",
                "logging.max_backups",
                "recovery.apology_status",
            ]
        );
    }

    #[test]
    fn test_file_path_must_name_a_file() {
        let mut config = AppConfig::default();
        config.logging.file_path = PathBuf::from("/");

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "logging.file_path: must name a file");
    }

    #[test]
    fn test_max_size_mb_upper_bound() {
        let mut config = AppConfig::default();
        config.logging.max_size_mb = MAX_SIZE_MB;
        assert!(validate_config(&config).is_ok());

        config.logging.max_size_mb = MAX_SIZE_MB + 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logging.max_size_mb");
        assert_eq!(errors[0].reason, format!("must be <= {MAX_SIZE_MB}"));
    }
}
