//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (manager.rs, startup.rs):
//!     Install handlers → Load env layers → Parse config → Init logging
//!         → compose() → Validate dependencies → start() → Running
//!
//! Shutdown (manager.rs, shutdown.rs):
//!     Signal or shutdown() → Remove handlers → stop() under timeout
//!         → Terminated → Exit status published
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Panic → Logged, process keeps running
//! ```
//!
//! # Design Decisions
//! - State only moves forward: Created → Running → ShuttingDown → Terminated
//! - The stop sequence runs at most once, however many triggers race
//! - `run()` returns the exit status; the binary decides how to exit

mod application;
pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;
mod types;

pub use application::Application;
pub use manager::{LifecycleBuilder, LifecycleManager};
pub use shutdown::{ExitStatus, Shutdown};
pub use signals::{ProcessHandlers, Signal};
pub use state::ApplicationState;
pub use types::{BoxError, ShutdownError, StartupError};
