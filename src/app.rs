//! The standard service process.
//!
//! Registers process metrics, the metrics registry, the aux HTTP server and,
//! when keys are configured, the token service. Only the aux server has
//! anything to start or stop.

use async_trait::async_trait;

use crate::config::{AppConfig, Environment};
use crate::http::AuxHttpServer;
use crate::lifecycle::startup::register_standard_services;
use crate::lifecycle::{Application, BoxError};
use crate::registry::ServiceRegistry;

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardApp;

#[async_trait]
impl Application for StandardApp {
    fn name(&self) -> &str {
        env!("CARGO_PKG_NAME")
    }

    async fn compose(
        &self,
        _env: &Environment,
        config: &AppConfig,
        services: &mut ServiceRegistry,
    ) -> Result<(), BoxError> {
        register_standard_services(config, services)
    }

    async fn start(&self, services: &ServiceRegistry) -> Result<(), BoxError> {
        let server = services.require::<AuxHttpServer>()?;
        server.start(services).await?;
        Ok(())
    }

    async fn stop(&self, services: &ServiceRegistry) -> Result<(), BoxError> {
        if let Some(server) = services.get::<AuxHttpServer>() {
            server.stop().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuxHttpConfig, RunMode};

    #[tokio::test]
    async fn test_start_and_stop_aux_server() {
        let mut config = AppConfig::default();
        config.aux_http = AuxHttpConfig {
            host: "127.0.0.1".into(),
            port: 0,
            shutdown_delay_ms: 0,
        };
        let env = Environment::from_vars(RunMode::Test, Vec::<(String, String)>::new());

        let mut services = ServiceRegistry::new();
        StandardApp.compose(&env, &config, &mut services).await.unwrap();
        StandardApp.start(&services).await.unwrap();

        let server = services.get::<AuxHttpServer>().unwrap();
        assert!(server.local_addr().await.is_some());

        StandardApp.stop(&services).await.unwrap();
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_without_services() {
        assert!(StandardApp.stop(&ServiceRegistry::new()).await.is_ok());
    }
}
