//! Extension points implemented by the concrete application.

use async_trait::async_trait;

use crate::config::{AppConfig, Environment};
use crate::lifecycle::types::BoxError;
use crate::registry::ServiceRegistry;

/// Hooks driven by [`LifecycleManager`](crate::lifecycle::LifecycleManager).
///
/// The manager assumes nothing about the hooks beyond that they are async and
/// may fail.
#[async_trait]
pub trait Application
where
    Self: Send + Sync + 'static,
{
    /// Name used in lifecycle log lines.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Build the service registry from the loaded configuration.
    ///
    /// Runs after the environment is loaded and before dependency validation.
    async fn compose(
        &self,
        env: &Environment,
        config: &AppConfig,
        services: &mut ServiceRegistry,
    ) -> Result<(), BoxError> {
        let _ = (env, config, services);
        Ok(())
    }

    /// Application initialization code.
    async fn start(&self, services: &ServiceRegistry) -> Result<(), BoxError>;

    /// Application shutdown code.
    async fn stop(&self, services: &ServiceRegistry) -> Result<(), BoxError>;
}
