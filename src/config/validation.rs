//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (parsing handles syntax)
//! - Validate value ranges (timeouts > 0, non-empty host and issuer)
//! - Check the log filter is understood by the subscriber
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::schema::AppConfig;

/// A single rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Environment variable the value came from.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A bare word must be a level; anything else is parsed as filter directives.
fn is_valid_filter(filter: &str) -> bool {
    if filter.contains(['=', ',']) {
        EnvFilter::try_new(filter).is_ok()
    } else {
        filter.parse::<LevelFilter>().is_ok()
    }
}

/// Check the semantic constraints of a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_filter(&config.logging.level) {
        errors.push(ValidationError::new(
            "LOG_LEVEL",
            format!("invalid log filter {:?}", config.logging.level),
        ));
    }

    if config.aux_http.host.is_empty() {
        errors.push(ValidationError::new("AUX_HTTP_HOST", "must not be empty"));
    }

    if config.jwt.issuer.trim().is_empty() {
        errors.push(ValidationError::new("JWT_ISSUER", "must not be empty"));
    }

    if config.jwt.public_key.is_some() && config.jwt.private_key.is_none() {
        tracing::debug!("JWT public key configured without private key; tokens can only be verified");
    }

    if config.lifecycle.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "SHUTDOWN_TIMEOUT_SECS",
            "must be greater than 0",
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.aux_http.host = String::new();
        config.jwt.issuer = " ".into();
        config.lifecycle.shutdown_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].to_string(), "AUX_HTTP_HOST: must not be empty");
    }

    #[test]
    fn test_rejects_bad_log_filter() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "LOG_LEVEL");

        config.logging.level = "app_bootstrap=bogus".into();
        assert!(validate_config(&config).is_err());

        config.logging.level = "info,app_bootstrap=debug".into();
        assert!(validate_config(&config).is_ok());
    }
}
