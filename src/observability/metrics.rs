//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Sample process CPU and memory on demand
//! - Count aux HTTP requests
//! - Render Prometheus exposition text
//!
//! # Metrics
//! - `app_process_cpu_usage{type}` (gauge): CPU usage in percent
//! - `app_process_memory_usage{type}` (gauge): rss / virtual bytes
//! - `app_process_uptime_seconds` (gauge): time since the sampler was created
//! - `app_http_requests_total{path,status}` (counter): aux HTTP requests

use std::sync::Mutex;
use std::time::Instant;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("cannot determine current process id: {0}")]
    Pid(&'static str),
}

/// One sample of the current process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSnapshot {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub uptime_secs: u64,
}

/// Pull-based sampler for the current process.
pub struct ProcessMetrics {
    pid: Pid,
    system: Mutex<System>,
    started: Instant,
}

impl ProcessMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let pid = sysinfo::get_current_pid().map_err(MetricsError::Pid)?;
        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
            started: Instant::now(),
        })
    }

    /// Refresh and sample. `None` if the process table has no entry for us.
    pub fn collect(&self) -> Option<ProcessSnapshot> {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let process = system.process(self.pid)?;
        Some(ProcessSnapshot {
            cpu_percent: process.cpu_usage(),
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
            uptime_secs: self.started.elapsed().as_secs(),
        })
    }
}

/// Owned Prometheus recorder. Nothing is installed globally.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self { recorder, handle }
    }

    pub fn record_process(&self, snapshot: &ProcessSnapshot) {
        metrics::with_local_recorder(&self.recorder, || {
            gauge!("app_process_cpu_usage", "type" => "percent").set(f64::from(snapshot.cpu_percent));
            gauge!("app_process_memory_usage", "type" => "rss").set(snapshot.rss_bytes as f64);
            gauge!("app_process_memory_usage", "type" => "virtual").set(snapshot.virtual_bytes as f64);
            gauge!("app_process_uptime_seconds").set(snapshot.uptime_secs as f64);
        });
    }

    pub fn record_request(&self, path: &str, status: u16) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                "app_http_requests_total",
                "path" => path.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_current_process() {
        let metrics = ProcessMetrics::new().unwrap();
        let snapshot = metrics.collect().unwrap();
        assert!(snapshot.rss_bytes > 0);
    }

    #[test]
    fn test_render_recorded_values() {
        let registry = MetricsRegistry::new();
        registry.record_process(&ProcessSnapshot {
            cpu_percent: 1.5,
            rss_bytes: 2048,
            virtual_bytes: 4096,
            uptime_secs: 7,
        });
        registry.record_request("/status", 200);
        registry.record_request("/status", 200);

        let text = registry.render();
        assert!(text.contains(r#"app_process_memory_usage{type="rss"} 2048"#));
        assert!(text.contains("app_process_uptime_seconds 7"));
        assert!(text.contains(r#"app_http_requests_total{path="/status",status="200"} 2"#));
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.record_request("/status", 200);

        assert!(!b.render().contains("app_http_requests_total"));
    }
}
