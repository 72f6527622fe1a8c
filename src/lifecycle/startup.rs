//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the layered environment and parse configuration
//! - Initialize logging before anything else logs
//! - Register the standard services in dependency order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use crate::auth::TokenService;
use crate::config::{AppConfig, Environment, EnvironmentLoader, RunMode};
use crate::http::AuxHttpServer;
use crate::lifecycle::types::{BoxError, StartupError};
use crate::observability::{logging, MetricsRegistry, ProcessMetrics};
use crate::registry::ServiceRegistry;

/// Loader used when the manager was not given one.
pub fn default_loader() -> EnvironmentLoader {
    EnvironmentLoader::for_mode(RunMode::detect())
}

/// Load the environment, parse the configuration and initialize logging.
pub fn load_configuration(loader: &EnvironmentLoader) -> Result<(Environment, AppConfig), StartupError> {
    let env = loader.load()?;
    let config = AppConfig::from_env(&env)?;

    logging::init(&config.logging);
    tracing::info!(
        mode = %env.mode(),
        layers = ?env.sources(),
        "Configuration loaded"
    );
    tracing::debug!(config = ?config.redacted(), "Effective configuration");

    Ok((env, config))
}

/// Register process metrics, the metrics registry and the aux HTTP server.
///
/// A [`TokenService`] is added when signing keys are configured.
pub fn register_standard_services(config: &AppConfig, services: &mut ServiceRegistry) -> Result<(), BoxError> {
    services.register(ProcessMetrics::new()?);
    services.register(MetricsRegistry::new());
    services.register_dependent(AuxHttpServer::new(config.aux_http.clone()));

    if config.jwt.has_keys() {
        services.register(TokenService::from_config(&config.jwt)?);
        tracing::info!(issuer = %config.jwt.issuer, "Token service configured");
    }
    Ok(())
}
