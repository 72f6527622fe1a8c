//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (gauges and counters on a local Prometheus recorder)
//!
//! Consumers:
//!     → stdout (JSON or pretty lines)
//!     → GET /metrics on the aux HTTP server (pull-based scrape)
//! ```
//!
//! # Design Decisions
//! - Formatter is a strategy chosen at init, not a logger subtype
//! - Process metrics are sampled on scrape, never on a timer
//! - The metrics recorder is owned, not installed globally

pub mod logging;
pub mod metrics;

pub use logging::error_chain;
pub use metrics::{MetricsRegistry, ProcessMetrics, ProcessSnapshot};
