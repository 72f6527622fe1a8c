//! RS256 token issuance and verification.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::auth::schema::{PayloadSchema, Typed};
use crate::auth::{SigningKeyPair, TokenError, TokenResult};
use crate::config::JwtConfig;

const ALGORITHM: &str = "RS256";

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Claim set carried by a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Why a credential was rejected. Never leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    Algorithm,
    Signature,
    Issuer,
    Expired,
    MissingPayload,
    Schema,
}

/// Issues and validates signed credentials.
pub struct TokenService {
    signing_key: SigningKey<Sha256>,
    verifying_key: VerifyingKey<Sha256>,
    issuer: String,
}

impl TokenService {
    pub fn new(keys: SigningKeyPair) -> Self {
        Self {
            signing_key: SigningKey::new(keys.private_key().clone()),
            verifying_key: VerifyingKey::new(keys.public_key().clone()),
            issuer: keys.issuer().to_string(),
        }
    }

    pub fn from_config(config: &JwtConfig) -> TokenResult<Self> {
        SigningKeyPair::from_config(config).map(Self::new)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `payload` into a credential valid for `expires_in`.
    ///
    /// The payload must serialize to a JSON object.
    pub fn create_token<P: Serialize + ?Sized>(&self, payload: &P, expires_in: Duration) -> TokenResult<String> {
        self.create_token_at(payload, expires_in, unix_now())
    }

    fn create_token_at<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        expires_in: Duration,
        issued_at: u64,
    ) -> TokenResult<String> {
        let payload = serde_json::to_value(payload).map_err(|e| TokenError::InvalidPayload(e.to_string()))?;
        if !payload.is_object() {
            return Err(TokenError::InvalidPayload("payload must be a JSON object".to_string()));
        }

        let claims = Claims {
            payload: Some(payload),
            iss: Some(self.issuer.clone()),
            iat: Some(issued_at),
            exp: Some(issued_at.saturating_add(expires_in.as_secs())),
        };
        self.sign_claims(&claims)
    }

    fn sign_claims(&self, claims: &Claims) -> TokenResult<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(claims)?);

        // Blinded with a fresh RNG; PKCS#1 v1.5 output is still deterministic.
        let signature = self
            .signing_key
            .try_sign_with_rng(&mut rand::thread_rng(), signing_input.as_bytes())
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Verify `token` and decode its payload through `schema`.
    ///
    /// Every failure is [`TokenError::Untrusted`].
    pub fn decode_token<S: PayloadSchema>(&self, token: &str, schema: &S) -> TokenResult<S::Output> {
        self.decode_token_at(token, schema, unix_now())
    }

    /// Verify `token` and deserialize its payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> TokenResult<T> {
        self.decode_token(token, &Typed::<T>::new())
    }

    fn decode_token_at<S: PayloadSchema>(&self, token: &str, schema: &S, now: u64) -> TokenResult<S::Output> {
        let result = self
            .verify(token, now)
            .and_then(|payload| schema.decode(payload).map_err(|_| Rejection::Schema));

        result.map_err(|reason| {
            tracing::debug!(?reason, "Credential rejected");
            TokenError::Untrusted
        })
    }

    fn verify(&self, token: &str, now: u64) -> Result<Value, Rejection> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(Rejection::Malformed);
        };

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(Rejection::Algorithm);
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Rejection::Malformed)?;
        let signature = Signature::try_from(signature_bytes.as_slice()).map_err(|_| Rejection::Signature)?;
        let signing_input = &token[..token.len() - signature_len(token)];
        self.verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| Rejection::Signature)?;

        let claims: Claims = decode_segment(claims)?;
        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(Rejection::Issuer);
        }
        match claims.exp {
            Some(exp) if now < exp => {}
            _ => return Err(Rejection::Expired),
        }

        claims.payload.ok_or(Rejection::MissingPayload)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Length of the trailing `.signature` part.
fn signature_len(token: &str) -> usize {
    token.rfind('.').map_or(0, |idx| token.len() - idx)
}

fn encode_segment<T: Serialize>(value: &T) -> TokenResult<String> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, Rejection> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| Rejection::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| Rejection::Malformed)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
