//! Standard service process.
//!
//! # Architecture Overview
//!
//! ```text
//!   APP_ENV ──▶ .env layers ──▶ AppConfig ──▶ logging
//!                                   │
//!                                   ▼
//!                          StandardApp::compose
//!                                   │
//!             ┌─────────────────────┼─────────────────────┐
//!             ▼                     ▼                     ▼
//!      ProcessMetrics        MetricsRegistry        TokenService
//!             │                     │               (keys only)
//!             └──────────┬──────────┘
//!                        ▼
//!                  AuxHttpServer ──▶ /status, /metrics
//!
//!   SIGTERM / SIGINT ──▶ shutdown() ──▶ stop() ──▶ exit code
//! ```

use std::process::ExitCode;

use app_bootstrap::{LifecycleManager, StandardApp};

#[tokio::main]
async fn main() -> ExitCode {
    LifecycleManager::new(StandardApp).run().await.into()
}
