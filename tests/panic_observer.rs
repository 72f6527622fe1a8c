//! Replaces the process panic hook, so it runs in its own test binary.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};

use app_bootstrap::lifecycle::signals::panic_observer_installs;
use app_bootstrap::lifecycle::{Application, ApplicationState, BoxError, ExitStatus, LifecycleManager};
use app_bootstrap::ServiceRegistry;
use async_trait::async_trait;

mod common;

static OUTER_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

struct IdleApp;

#[async_trait]
impl Application for IdleApp {
    async fn start(&self, _services: &ServiceRegistry) -> Result<(), BoxError> {
        Ok(())
    }

    async fn stop(&self, _services: &ServiceRegistry) -> Result<(), BoxError> {
        Ok(())
    }
}

async fn panic_in_task() {
    let err = tokio::spawn(async { panic!("task failure") }).await.unwrap_err();
    assert!(err.is_panic());
}

fn spawn_manager(dir: &std::path::Path) -> (LifecycleManager<IdleApp>, tokio::task::JoinHandle<ExitStatus>) {
    let manager = LifecycleManager::builder(IdleApp)
        .environment(common::loader(dir, &[]))
        .build();
    let run = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });
    (manager, run)
}

#[tokio::test]
async fn test_panic_observer_shared_and_restored() {
    panic::set_hook(Box::new(|_| {
        OUTER_HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }));

    let dir = common::env_dir(&[]);
    let (first, first_run) = spawn_manager(dir.path());
    let (second, second_run) = spawn_manager(dir.path());
    common::wait_for_state(&first, ApplicationState::Running).await;
    common::wait_for_state(&second, ApplicationState::Running).await;
    assert_eq!(panic_observer_installs(), 2);

    // Logged by the observer; nothing stops.
    panic_in_task().await;
    assert_eq!(OUTER_HOOK_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(first.state(), ApplicationState::Running);
    assert_eq!(second.state(), ApplicationState::Running);

    // The remaining manager keeps the observer in place.
    assert_eq!(first.shutdown().await, Some(ExitStatus::Success));
    assert_eq!(first_run.await.unwrap(), ExitStatus::Success);
    panic_in_task().await;
    assert_eq!(OUTER_HOOK_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(second.state(), ApplicationState::Running);

    // Releasing the last installation brings back the hook set above.
    assert_eq!(second.shutdown().await, Some(ExitStatus::Success));
    assert_eq!(second_run.await.unwrap(), ExitStatus::Success);
    assert_eq!(panic_observer_installs(), 0);
    panic_in_task().await;
    assert_eq!(OUTER_HOOK_CALLS.load(Ordering::SeqCst), 1);

    let _ = panic::take_hook();
}
