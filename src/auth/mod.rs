//! Credential issuance and validation.
//!
//! # Data Flow
//! ```text
//! create_token:
//!     payload → { payload, iss, iat, exp } → RS256 sign (private key) → compact JWS
//!
//! decode_token:
//!     compact JWS → header/alg check → signature (public key)
//!         → iss / exp checks → `payload` claim → PayloadSchema → T
//! ```
//!
//! # Design Decisions
//! - Stateless; one key pair for the process lifetime
//! - Every verification failure is the same error to the caller
//! - The concrete rejection reason is only logged at debug level

pub mod keys;
pub mod schema;
pub mod token;

use thiserror::Error;

pub use keys::SigningKeyPair;
pub use schema::{PayloadSchema, RawObject, SchemaError, Typed};
pub use token::{Claims, TokenService};

/// Errors that can occur while issuing or validating credentials.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The credential failed verification or does not match the expected shape.
    #[error("untrusted credential")]
    Untrusted,

    /// Key material is missing or cannot be parsed.
    #[error("invalid key material: {0}")]
    Key(String),

    /// The payload does not serialize to a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Signature computation failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Whether the error should be reported to the caller as bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Untrusted | Self::InvalidPayload(_))
    }
}

/// Result type for credential operations.
pub type TokenResult<T> = Result<T, TokenError>;
