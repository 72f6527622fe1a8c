//! Auxiliary HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (bind, serve, graceful drain)
//!     → handlers.rs (request ID, trace, panic guard, request counter)
//!     → /status | /metrics | JSON 404
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{build_router, AuxState, SystemStatus};
pub use server::{AuxHttpError, AuxHttpServer};
