//! Lifecycle error definitions.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, EnvironmentError};
use crate::registry::ConfigurationError;

/// Error type returned by application hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort startup. All are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to install process handlers")]
    Handlers(#[source] io::Error),

    #[error("failed to load environment")]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("service composition failed")]
    Compose(#[source] BoxError),

    #[error(transparent)]
    Dependencies(#[from] ConfigurationError),

    #[error("start hook failed")]
    Hook(#[source] BoxError),

    #[error("application has already been run")]
    AlreadyRun,
}

/// Errors raised while stopping. Fatal, but reported apart from startup failures.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("stop hook failed")]
    Hook(#[source] BoxError),

    #[error("stop hook did not finish within {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::error_chain;
    use crate::registry::ServiceKey;

    #[test]
    fn test_error_display() {
        let err = StartupError::Hook("port in use".into());
        assert_eq!(error_chain(&err), "start hook failed: port in use");

        let err = StartupError::from(ConfigurationError::MissingDependencies(vec![
            ServiceKey::named("db"),
        ]));
        assert_eq!(
            err.to_string(),
            "the following service dependencies are not registered: db"
        );

        let err = ShutdownError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "stop hook did not finish within 30s");
    }
}
