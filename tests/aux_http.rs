//! Runs the standard process on an ephemeral port and queries it over TCP.

use std::net::SocketAddr;

use app_bootstrap::http::AuxHttpServer;
use app_bootstrap::lifecycle::{ApplicationState, ExitStatus, LifecycleManager};
use app_bootstrap::StandardApp;
use serde_json::Value;

mod common;

async fn aux_addr(manager: &LifecycleManager<StandardApp>) -> SocketAddr {
    manager
        .services()
        .and_then(|services| services.get::<AuxHttpServer>())
        .unwrap()
        .local_addr()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_status_and_metrics_endpoints() {
    let dir = common::env_dir(&[(".env", "AUX_HTTP_HOST=127.0.0.1\nAUX_HTTP_PORT=0\n")]);
    let manager = LifecycleManager::builder(StandardApp)
        .environment(common::loader(dir.path(), &[".env"]))
        .build();
    let run = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run().await }
    });
    common::wait_for_state(&manager, ApplicationState::Running).await;

    let base = format!("http://{}", aux_addr(&manager).await);
    let client = reqwest::Client::new();

    let status = client.get(format!("{base}/status")).send().await.unwrap();
    assert_eq!(status.status(), 200);
    assert!(status.headers().contains_key("x-request-id"));
    let body: Value = status.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].is_u64());

    let metrics = client
        .get(format!("{base}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("app_process_memory_usage"));
    assert!(metrics.contains(r#"app_http_requests_total{path="/status",status="200"} 1"#));

    let missing = client.get(format!("{base}/missing")).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    assert_eq!(manager.shutdown().await, Some(ExitStatus::Success));
    assert_eq!(run.await.unwrap(), ExitStatus::Success);
    assert!(client.get(format!("{base}/status")).send().await.is_err());
}

#[tokio::test]
async fn test_bind_failure_is_a_startup_failure() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let layer = format!("AUX_HTTP_HOST=127.0.0.1\nAUX_HTTP_PORT={port}\n");
    let dir = common::env_dir(&[(".env", layer.as_str())]);
    let manager = LifecycleManager::builder(StandardApp)
        .environment(common::loader(dir.path(), &[".env"]))
        .build();

    assert_eq!(manager.run().await, ExitStatus::Failure);
    assert_eq!(manager.state(), ApplicationState::Terminated);
}
