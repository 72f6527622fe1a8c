//! Aux HTTP server.
//!
//! # Responsibilities
//! - Bind the listener from [`AuxHttpConfig`]
//! - Serve the aux router on a background task
//! - Drain in-flight requests on stop
//!
//! # Design Decisions
//! - The listener is bound inside `start`, so a bind failure fails startup
//! - Optional delay before draining gives load balancers time to deregister
//! - `stop` is idempotent; stopping a server that never started is a no-op

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::AuxHttpConfig;
use crate::http::handlers::{build_router, AuxState};
use crate::observability::{MetricsRegistry, ProcessMetrics};
use crate::registry::{ConfigurationError, Requires, ServiceKey, ServiceRegistry};

#[derive(Debug, Error)]
pub enum AuxHttpError {
    #[error("failed to bind aux http listener on {address}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Dependency(#[from] ConfigurationError),

    #[error("aux http server failed")]
    Serve(#[source] io::Error),

    #[error("aux http server task panicked")]
    Join(#[source] tokio::task::JoinError),

    #[error("aux http server already started")]
    AlreadyStarted,
}

struct Running {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

/// Status and metrics endpoint server.
pub struct AuxHttpServer {
    config: AuxHttpConfig,
    running: Mutex<Option<Running>>,
}

impl Requires for AuxHttpServer {
    fn requires() -> Vec<ServiceKey> {
        vec![
            ServiceKey::of::<ProcessMetrics>(),
            ServiceKey::of::<MetricsRegistry>(),
        ]
    }
}

impl AuxHttpServer {
    pub fn new(config: AuxHttpConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AuxHttpConfig {
        &self.config
    }

    /// Address the server is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }

    /// Bind and start serving. Returns the bound address.
    pub async fn start(&self, services: &ServiceRegistry) -> Result<SocketAddr, AuxHttpError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(AuxHttpError::AlreadyStarted);
        }

        let state = AuxState::new(
            services.require::<ProcessMetrics>()?,
            services.require::<MetricsRegistry>()?,
        );

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| AuxHttpError::Bind {
                address: address.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(AuxHttpError::Serve)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = build_router(state);
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(address = %addr, "Aux HTTP server listening");
        *running = Some(Running {
            addr,
            shutdown_tx,
            task,
        });
        Ok(addr)
    }

    /// Wait the configured delay, then drain and stop the server.
    pub async fn stop(&self) -> Result<(), AuxHttpError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        let delay = self.config.shutdown_delay();
        if !delay.is_zero() {
            tracing::debug!(delay = ?delay, "Delaying aux HTTP shutdown");
            tokio::time::sleep(delay).await;
        }

        let _ = running.shutdown_tx.send(());
        running
            .task
            .await
            .map_err(AuxHttpError::Join)?
            .map_err(AuxHttpError::Serve)?;

        tracing::info!(address = %running.addr, "Aux HTTP server stopped");
        Ok(())
    }
}
