//! Application bootstrap runtime.
//!
//! Brings a service process up and down in a controlled order: layered
//! environment loading, dependency validation before start, signal-driven
//! graceful shutdown with a single stop sequence, and RS256 credentials.

// Core subsystems
pub mod config;
pub mod lifecycle;
pub mod registry;

// Services
pub mod auth;
pub mod http;

// Cross-cutting concerns
pub mod observability;

pub mod app;

pub use app::StandardApp;
pub use auth::{TokenError, TokenService};
pub use config::{AppConfig, Environment, EnvironmentLoader, RunMode};
pub use lifecycle::{Application, ExitStatus, LifecycleManager};
pub use registry::{ServiceKey, ServiceRegistry};
