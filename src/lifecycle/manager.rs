//! Start/stop orchestration for one application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};
use std::time::Duration;

use crate::config::{AppConfig, EnvironmentLoader, LifecycleConfig, LoggingConfig};
use crate::lifecycle::application::Application;
use crate::lifecycle::shutdown::{ExitStatus, Shutdown};
use crate::lifecycle::signals::ProcessHandlers;
use crate::lifecycle::startup;
use crate::lifecycle::state::{ApplicationState, StateCell};
use crate::lifecycle::types::{ShutdownError, StartupError};
use crate::observability::{error_chain, logging};
use crate::registry::{assert_complete, ServiceRegistry};

static NO_SERVICES: LazyLock<ServiceRegistry> = LazyLock::new(ServiceRegistry::new);

struct Shared<A> {
    app: A,
    loader: Option<EnvironmentLoader>,
    shutdown_timeout: Option<Duration>,
    state: StateCell,
    run_started: AtomicBool,
    config: OnceLock<AppConfig>,
    services: OnceLock<ServiceRegistry>,
    handlers: Mutex<Option<ProcessHandlers>>,
    // Held across `start` and `stop` so the two hooks never overlap.
    start_gate: tokio::sync::Mutex<()>,
    exit: Shutdown,
}

/// Drives an [`Application`] from startup to exit.
///
/// Cheap to clone; clones share the same state machine.
pub struct LifecycleManager<A> {
    shared: Arc<Shared<A>>,
}

impl<A> Clone for LifecycleManager<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Builder for [`LifecycleManager`].
pub struct LifecycleBuilder<A> {
    app: A,
    loader: Option<EnvironmentLoader>,
    shutdown_timeout: Option<Duration>,
}

impl<A: Application> LifecycleBuilder<A> {
    /// Replace the default mode-based layer selection.
    pub fn environment(mut self, loader: EnvironmentLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Override `SHUTDOWN_TIMEOUT_SECS`.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> LifecycleManager<A> {
        LifecycleManager {
            shared: Arc::new(Shared {
                app: self.app,
                loader: self.loader,
                shutdown_timeout: self.shutdown_timeout,
                state: StateCell::new(),
                run_started: AtomicBool::new(false),
                config: OnceLock::new(),
                services: OnceLock::new(),
                handlers: Mutex::new(None),
                start_gate: tokio::sync::Mutex::new(()),
                exit: Shutdown::new(),
            }),
        }
    }
}

impl<A: Application> LifecycleManager<A> {
    pub fn new(app: A) -> Self {
        Self::builder(app).build()
    }

    pub fn builder(app: A) -> LifecycleBuilder<A> {
        LifecycleBuilder {
            app,
            loader: None,
            shutdown_timeout: None,
        }
    }

    pub fn app(&self) -> &A {
        &self.shared.app
    }

    pub fn state(&self) -> ApplicationState {
        self.shared.state.get()
    }

    /// Registry built by `compose`, once dependency validation passed.
    pub fn services(&self) -> Option<&ServiceRegistry> {
        self.shared.services.get()
    }

    pub fn config(&self) -> Option<&AppConfig> {
        self.shared.config.get()
    }

    /// Exit status published by the first completed shutdown or failed start.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.shared.exit.status()
    }

    /// Production entry point.
    ///
    /// Installs handlers, loads the environment, validates dependencies and
    /// starts the application, then waits for shutdown. Returns the status
    /// the process should exit with.
    pub async fn run(&self) -> ExitStatus {
        let name = self.shared.app.name();

        match self.startup().await {
            Ok(()) => self.shared.exit.wait().await,
            Err(StartupError::AlreadyRun) => {
                tracing::warn!(app = %name, "Application has already been run");
                ExitStatus::Failure
            }
            Err(error) => {
                logging::init(&LoggingConfig::default());
                tracing::error!(
                    app = %name,
                    error = %error_chain(&error),
                    "Failed to start {name}"
                );
                self.remove_handlers();

                if self
                    .shared
                    .state
                    .transition(ApplicationState::Created, ApplicationState::Terminated)
                    .is_ok()
                {
                    self.shared.exit.trigger(ExitStatus::Failure);
                } else {
                    // A signal arrived mid-startup; let its stop sequence finish.
                    self.shared.exit.wait().await;
                }
                ExitStatus::Failure
            }
        }
    }

    async fn startup(&self) -> Result<(), StartupError> {
        if self.shared.run_started.swap(true, Ordering::AcqRel) {
            return Err(StartupError::AlreadyRun);
        }

        if self.stopping() {
            tracing::warn!(app = %self.shared.app.name(), "Shutdown requested before startup");
            return Ok(());
        }
        self.install_handlers()?;

        let loader = self
            .shared
            .loader
            .clone()
            .unwrap_or_else(startup::default_loader);
        let (env, config) = startup::load_configuration(&loader)?;
        let config = self.shared.config.get_or_init(|| config);

        let mut services = ServiceRegistry::new();
        self.shared
            .app
            .compose(&env, config, &mut services)
            .await
            .map_err(StartupError::Compose)?;
        assert_complete(&services)?;
        let services = self.shared.services.get_or_init(|| services);

        let name = self.shared.app.name();
        let _gate = self.shared.start_gate.lock().await;
        if self.stopping() {
            tracing::warn!(app = %name, "Shutdown requested during startup, skipping start");
            return Ok(());
        }

        tracing::info!(app = %name, "Starting application");
        self.shared
            .app
            .start(services)
            .await
            .map_err(StartupError::Hook)?;

        if self
            .shared
            .state
            .transition(ApplicationState::Created, ApplicationState::Running)
            .is_ok()
        {
            tracing::info!(app = %name, "Application running");
        }
        Ok(())
    }

    fn stopping(&self) -> bool {
        self.shared.state.get() > ApplicationState::Created
    }

    fn install_handlers(&self) -> Result<(), StartupError> {
        let manager = self.clone();
        let handlers = ProcessHandlers::install(move |_signal| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager.shutdown().await;
            });
        })
        .map_err(StartupError::Handlers)?;

        // Checked under the lock that shutdown takes to remove handlers.
        let mut slot = self.lock_handlers();
        if self.stopping() {
            drop(slot);
            handlers.remove();
        } else {
            *slot = Some(handlers);
        }
        Ok(())
    }

    fn remove_handlers(&self) {
        let handlers = self.lock_handlers().take();
        if let Some(handlers) = handlers {
            handlers.remove();
        }
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, Option<ProcessHandlers>> {
        self.shared
            .handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn shutdown_timeout(&self) -> Duration {
        self.shared
            .shutdown_timeout
            .or_else(|| self.config().map(|c| c.lifecycle.shutdown_timeout()))
            .unwrap_or_else(|| LifecycleConfig::default().shutdown_timeout())
    }

    /// Stop the application once.
    ///
    /// The first call removes the process handlers, runs the stop hook under
    /// the shutdown timeout and publishes the exit status. Later calls return
    /// `None` without doing anything.
    pub async fn shutdown(&self) -> Option<ExitStatus> {
        if let Err(state) = self.shared.state.advance(ApplicationState::ShuttingDown) {
            tracing::debug!(%state, "Shutdown already handled");
            return None;
        }
        self.remove_handlers();

        let name = self.shared.app.name();
        let timeout = self.shutdown_timeout();
        // Waits for an in-flight start hook to return.
        let _gate = self.shared.start_gate.lock().await;
        let services = self.services().unwrap_or(&NO_SERVICES);
        tracing::info!(app = %name, timeout = ?timeout, "Stopping application");

        let result = match tokio::time::timeout(timeout, self.shared.app.stop(services)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ShutdownError::Hook(e)),
            Err(_) => Err(ShutdownError::Timeout(timeout)),
        };

        let status = match result {
            Ok(()) => {
                tracing::info!(app = %name, "Application stopped");
                ExitStatus::Success
            }
            Err(error) => {
                tracing::error!(
                    app = %name,
                    error = %error_chain(&error),
                    "Failed to stop {name}"
                );
                ExitStatus::Failure
            }
        };

        let _ = self.shared.state.advance(ApplicationState::Terminated);
        self.shared.exit.trigger(status);
        Some(status)
    }
}
