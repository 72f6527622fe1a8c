//! RSA key pair handling.
//!
//! # Security
//! - Private keys are loaded from configuration only
//! - Keys are never logged or serialized

use std::fmt;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::auth::{TokenError, TokenResult};
use crate::config::JwtConfig;

/// Private and public key plus the issuer they sign for.
#[derive(Clone)]
pub struct SigningKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    issuer: String,
}

impl SigningKeyPair {
    pub fn new(private_key: RsaPrivateKey, public_key: RsaPublicKey, issuer: impl Into<String>) -> Self {
        Self {
            private_key,
            public_key,
            issuer: issuer.into(),
        }
    }

    /// Pair whose public half is derived from the private key.
    pub fn from_private_key(private_key: RsaPrivateKey, issuer: impl Into<String>) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self::new(private_key, public_key, issuer)
    }

    /// Parse PEM key material (PKCS#8 or PKCS#1).
    ///
    /// Literal `\n` sequences, as found in single-line env values, are unescaped.
    pub fn from_pem(private_pem: &str, public_pem: Option<&str>, issuer: impl Into<String>) -> TokenResult<Self> {
        let private_key = parse_private_key(&unescape(private_pem))?;
        let public_key = match public_pem {
            Some(pem) => parse_public_key(&unescape(pem))?,
            None => RsaPublicKey::from(&private_key),
        };
        Ok(Self::new(private_key, public_key, issuer))
    }

    pub fn from_config(config: &JwtConfig) -> TokenResult<Self> {
        let private_pem = config
            .private_key
            .as_deref()
            .ok_or_else(|| TokenError::Key("JWT_PRIVATE_KEY is not set".to_string()))?;
        Self::from_pem(private_pem, config.public_key.as_deref(), config.issuer.clone())
    }

    /// Generate a fresh key pair.
    pub fn generate(bits: usize, issuer: impl Into<String>) -> TokenResult<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| TokenError::Key(format!("key generation failed: {e}")))?;
        Ok(Self::from_private_key(private_key, issuer))
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// PKCS#8 private key PEM.
    pub fn private_key_pem(&self) -> TokenResult<String> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.as_str().to_owned())
            .map_err(|e| TokenError::Key(e.to_string()))
    }

    /// SPKI public key PEM.
    pub fn public_key_pem(&self) -> TokenResult<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TokenError::Key(e.to_string()))
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

fn unescape(pem: &str) -> String {
    pem.trim().replace("\\n", "\n")
}

fn parse_private_key(pem: &str) -> TokenResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| TokenError::Key(format!("cannot parse private key: {e}")))
}

fn parse_public_key(pem: &str) -> TokenResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| TokenError::Key(format!("cannot parse public key: {e}")))
}
