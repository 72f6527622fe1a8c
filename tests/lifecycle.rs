//! End-to-end tests for `LifecycleManager::run` and `shutdown`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use app_bootstrap::config::{AppConfig, Environment, RunMode};
use app_bootstrap::lifecycle::{Application, ApplicationState, BoxError, ExitStatus, LifecycleManager};
use app_bootstrap::{EnvironmentLoader, ServiceKey, ServiceRegistry};
use async_trait::async_trait;

mod common;

struct Greeting(String);

#[derive(Default)]
struct SpyApp {
    starts: AtomicUsize,
    stops: AtomicUsize,
    require_mailer: bool,
    seen_greeting: Mutex<Option<String>>,
}

#[async_trait]
impl Application for SpyApp {
    fn name(&self) -> &str {
        "spy"
    }

    async fn compose(
        &self,
        env: &Environment,
        _config: &AppConfig,
        services: &mut ServiceRegistry,
    ) -> Result<(), BoxError> {
        let greeting = env.get("GREETING").unwrap_or("none").to_string();
        services.register(Greeting(greeting));
        if self.require_mailer {
            services.declare_key(ServiceKey::named("mailer"));
            services.declare_key(ServiceKey::named("cache"));
        }
        Ok(())
    }

    async fn start(&self, services: &ServiceRegistry) -> Result<(), BoxError> {
        let greeting = services.require::<Greeting>()?;
        *self.seen_greeting.lock().unwrap() = Some(greeting.0.clone());
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _services: &ServiceRegistry) -> Result<(), BoxError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_layered_environment_reaches_application() {
    let dir = common::env_dir(&[
        (".env", "GREETING=base\n"),
        (".env.dev", "GREETING=dev\n"),
        (".env.test", "GREETING=test\n"),
    ]);

    let manager = LifecycleManager::builder(SpyApp::default())
        .environment(common::loader(dir.path(), &[".env", ".env.dev"]))
        .build();
    let run = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });

    common::wait_for_state(&manager, ApplicationState::Running).await;
    assert_eq!(manager.app().seen_greeting.lock().unwrap().as_deref(), Some("dev"));

    assert_eq!(manager.shutdown().await, Some(ExitStatus::Success));
    assert_eq!(run.await.unwrap(), ExitStatus::Success);
}

#[tokio::test]
async fn test_test_mode_layers() {
    let dir = common::env_dir(&[
        (".env", "GREETING=base\nLOG_LEVEL=warn\n"),
        (".env.test", "GREETING=test\n"),
    ]);

    let loader = EnvironmentLoader::for_mode(RunMode::Test)
        .include_process_env(false)
        .base_dir(dir.path());
    let manager = LifecycleManager::builder(SpyApp::default())
        .environment(loader)
        .build();
    let run = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });

    common::wait_for_state(&manager, ApplicationState::Running).await;
    assert_eq!(manager.app().seen_greeting.lock().unwrap().as_deref(), Some("test"));
    assert_eq!(manager.config().unwrap().mode, RunMode::Test);
    assert_eq!(manager.config().unwrap().logging.level, "warn");

    manager.shutdown().await;
    assert_eq!(run.await.unwrap(), ExitStatus::Success);
}

#[tokio::test]
async fn test_missing_dependencies_prevent_start() {
    let dir = common::env_dir(&[]);
    let manager = LifecycleManager::builder(SpyApp {
        require_mailer: true,
        ..Default::default()
    })
    .environment(common::loader(dir.path(), &[".env"]))
    .build();

    assert_eq!(manager.run().await, ExitStatus::Failure);
    assert_eq!(manager.app().starts.load(Ordering::SeqCst), 0);
    assert_eq!(manager.app().stops.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state(), ApplicationState::Terminated);
}

#[tokio::test]
async fn test_invalid_configuration_prevents_start() {
    let dir = common::env_dir(&[(".env", "SHUTDOWN_TIMEOUT_SECS=0\nAUX_HTTP_PORT=http\n")]);
    let manager = LifecycleManager::builder(SpyApp::default())
        .environment(common::loader(dir.path(), &[".env"]))
        .build();

    assert_eq!(manager.run().await, ExitStatus::Failure);
    assert_eq!(manager.app().starts.load(Ordering::SeqCst), 0);
    assert!(manager.config().is_none());
}

#[tokio::test]
async fn test_racing_shutdowns_stop_once() {
    let dir = common::env_dir(&[]);
    let manager = LifecycleManager::builder(SpyApp::default())
        .environment(common::loader(dir.path(), &[]))
        .build();
    let run = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });
    common::wait_for_state(&manager, ApplicationState::Running).await;

    let triggers: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.shutdown().await })
        })
        .collect();

    let mut completed = 0;
    for trigger in triggers {
        if trigger.await.unwrap().is_some() {
            completed += 1;
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(manager.app().stops.load(Ordering::SeqCst), 1);
    assert_eq!(run.await.unwrap(), ExitStatus::Success);
    assert_eq!(manager.state(), ApplicationState::Terminated);
}
