//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! APP_ENV → RunMode
//!     → loader.rs (layered dotenv files, lowest priority first)
//!     → Environment (immutable snapshot, process env on top)
//!     → schema.rs (typed AppConfig with defaults)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Loaded once per run; there is no reload
//! - All fields have defaults to allow an empty environment
//! - Layer precedence is explicit data, not implied by call order

pub mod loader;
pub mod schema;
pub mod validation;

use thiserror::Error;

pub use loader::{Environment, EnvironmentError, EnvironmentLoader, RunMode};
pub use schema::{AppConfig, AuxHttpConfig, JwtConfig, LifecycleConfig, LogFormat, LoggingConfig};
pub use validation::ValidationError;

/// Error type for configuration parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
