//! Configuration schema definitions.
//!
//! Every field has a documented default so an empty environment yields a
//! runnable configuration. Values are read from an [`Environment`] by
//! [`AppConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::loader::{Environment, RunMode};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ConfigError;

/// Root configuration for the application runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Runtime mode the environment was loaded for.
    pub mode: RunMode,

    /// Logger settings.
    pub logging: LoggingConfig,

    /// Auxiliary status/metrics HTTP server.
    pub aux_http: AuxHttpConfig,

    /// Credential signing material.
    pub jwt: JwtConfig,

    /// Start/stop orchestration.
    pub lifecycle: LifecycleConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    #[default]
    Structured,
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`LOG_LEVEL`, default `info`).
    pub level: String,

    /// Output format (`LOG_PRETTY`, default structured).
    pub format: LogFormat,

    /// Include source file and line (`LOG_LOCATION`, default false).
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Structured,
            include_location: false,
        }
    }
}

/// Aux HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuxHttpConfig {
    /// Bind host (`AUX_HTTP_HOST`, default `0.0.0.0`).
    pub host: String,

    /// Bind port (`AUX_HTTP_PORT`, default 8081).
    pub port: u16,

    /// Delay before graceful shutdown begins (`AUX_HTTP_SHUTDOWN_DELAY_MS`, default 0).
    pub shutdown_delay_ms: u64,
}

impl Default for AuxHttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            shutdown_delay_ms: 0,
        }
    }
}

impl AuxHttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_millis(self.shutdown_delay_ms)
    }
}

/// Credential signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// PEM private key (`JWT_PRIVATE_KEY`).
    pub private_key: Option<String>,

    /// PEM public key (`JWT_PUBLIC_KEY`). Derived from the private key when absent.
    pub public_key: Option<String>,

    /// Issuer claim (`JWT_ISSUER`, default `nodescript.dev`).
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            public_key: None,
            issuer: "nodescript.dev".to_string(),
        }
    }
}

impl JwtConfig {
    pub fn has_keys(&self) -> bool {
        self.private_key.is_some()
    }
}

// Key material never reaches logs through Debug.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| REDACTED))
            .field("public_key", &self.public_key.as_ref().map(|_| REDACTED))
            .field("issuer", &self.issuer)
            .finish()
    }
}

const REDACTED: &str = "<redacted>";

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound on the stop hook (`SHUTDOWN_TIMEOUT_SECS`, default 30).
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
        }
    }
}

impl LifecycleConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl AppConfig {
    /// Build and validate the configuration from a loaded environment.
    ///
    /// All unparseable values and validation failures are reported together.
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let defaults = Self::default();

        let config = Self {
            mode: env.mode(),
            logging: LoggingConfig {
                level: string_or(env, "LOG_LEVEL", defaults.logging.level),
                format: if parse_or(env, "LOG_PRETTY", false, &mut errors) {
                    LogFormat::Pretty
                } else {
                    LogFormat::Structured
                },
                include_location: parse_or(
                    env,
                    "LOG_LOCATION",
                    defaults.logging.include_location,
                    &mut errors,
                ),
            },
            aux_http: AuxHttpConfig {
                host: string_or(env, "AUX_HTTP_HOST", defaults.aux_http.host),
                port: parse_or(env, "AUX_HTTP_PORT", defaults.aux_http.port, &mut errors),
                shutdown_delay_ms: parse_or(
                    env,
                    "AUX_HTTP_SHUTDOWN_DELAY_MS",
                    defaults.aux_http.shutdown_delay_ms,
                    &mut errors,
                ),
            },
            jwt: JwtConfig {
                private_key: non_empty(env, "JWT_PRIVATE_KEY"),
                public_key: non_empty(env, "JWT_PUBLIC_KEY"),
                issuer: string_or(env, "JWT_ISSUER", defaults.jwt.issuer),
            },
            lifecycle: LifecycleConfig {
                shutdown_timeout_secs: parse_or(
                    env,
                    "SHUTDOWN_TIMEOUT_SECS",
                    defaults.lifecycle.shutdown_timeout_secs,
                    &mut errors,
                ),
            },
        };

        if let Err(mut invalid) = validate_config(&config) {
            errors.append(&mut invalid);
        }

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Copy safe to log: key material replaced with a marker.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.jwt.private_key = copy.jwt.private_key.map(|_| REDACTED.to_string());
        copy.jwt.public_key = copy.jwt.public_key.map(|_| REDACTED.to_string());
        copy
    }
}

fn non_empty(env: &Environment, key: &str) -> Option<String> {
    env.get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn string_or(env: &Environment, key: &str, default: String) -> String {
    non_empty(env, key).unwrap_or(default)
}

fn parse_or<T: FromStr>(
    env: &Environment,
    key: &'static str,
    default: T,
    errors: &mut Vec<ValidationError>,
) -> T {
    match non_empty(env, key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(ValidationError::new(key, format!("cannot parse {raw:?}")));
            default
        }),
    }
}
