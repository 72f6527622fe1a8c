//! Shared utilities for integration tests.

use std::path::Path;
use std::time::Duration;

use app_bootstrap::lifecycle::{Application, ApplicationState, LifecycleManager};
use app_bootstrap::EnvironmentLoader;
use tempfile::TempDir;

/// Write dotenv layer files into a fresh temporary directory.
pub fn env_dir(layers: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in layers {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

/// Loader over the given layer names, isolated from the process environment.
pub fn loader(dir: &Path, layers: &[&str]) -> EnvironmentLoader {
    EnvironmentLoader::new()
        .include_process_env(false)
        .base_dir(dir)
        .layers(layers.iter().copied())
}

/// Poll until the manager reports `state`, panicking after a few seconds.
pub async fn wait_for_state<A: Application>(manager: &LifecycleManager<A>, state: ApplicationState) {
    for _ in 0..500 {
        if manager.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("manager never reached {state}, stuck at {}", manager.state());
}
