//! Token codec: signs claims into a compact JWT string and verifies them back.
//!
//! Signature verification is delegated to `jsonwebtoken`, which compares MACs in
//! constant time. Expiry is checked here against an explicit `now` so that the
//! boundary instant counts as expired and the leeway is exact.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{SigningAlgorithm, TokenConfig};

/// Signed payload of every token. Nothing else may ride along in the signed material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject (username). Empty when the token carried no `sub` claim.
    #[serde(rename = "sub", default)]
    pub subject: String,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, expires_at: u64) -> Self {
        Self {
            subject: subject.into(),
            expires_at,
        }
    }
}

/// Current time as Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Encodes and decodes tokens with one secret and one algorithm.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    leeway_secs: u64,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            algorithm: config.algorithm(),
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            leeway_secs: config.leeway_secs(),
        }
    }

    /// Sign the claims. Deterministic for identical claims and key.
    pub fn encode(&self, claims: &Claims) -> Result<String, EncodeError> {
        jsonwebtoken::encode(&Header::new(self.algorithm.to_jwt()), claims, &self.encoding_key)
            .map_err(EncodeError)
    }

    /// Verify and decode a token against the current time.
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        self.decode_at(token, unix_now())
    }

    /// Verify and decode a token as of `now` (Unix seconds).
    pub fn decode_at(&self, token: &str, now: u64) -> Result<Claims, DecodeError> {
        let mut validation = Validation::new(self.algorithm.to_jwt());
        validation.leeway = 0;
        validation.validate_exp = false;

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| DecodeError::from(e.kind()))?
            .claims;

        if now >= claims.expires_at.saturating_add(self.leeway_secs) {
            return Err(DecodeError::Expired);
        }

        Ok(claims)
    }
}

/// Why a token was rejected. Only for logs and tests: clients see one generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a structurally valid token
    Malformed,
    /// Signature does not match (tampering, wrong key or wrong algorithm)
    BadSignature,
    /// Expiry instant has passed
    Expired,
}

impl From<&ErrorKind> for DecodeError {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => DecodeError::BadSignature,
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            _ => DecodeError::Malformed,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed => write!(f, "Malformed token"),
            DecodeError::BadSignature => write!(f, "Bad token signature"),
            DecodeError::Expired => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Error encoding the token.
#[derive(Debug)]
pub struct EncodeError(jsonwebtoken::errors::Error);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to encode token: {}", self.0)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}
