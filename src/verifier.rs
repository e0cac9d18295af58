//! Turns a raw token string into a verified subject or principal.

use crate::config::TokenConfig;
use crate::identity::{IdentityLookup, LookupError, Principal};
use crate::jwt::{Claims, DecodeError, TokenCodec, unix_now};

#[derive(Clone)]
pub struct SessionVerifier {
    codec: TokenCodec,
}

impl SessionVerifier {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            codec: TokenCodec::new(config),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        self.verify_at(token, unix_now())
    }

    /// Decode the token as of `now` and require a subject.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, VerificationError> {
        let claims = self
            .codec
            .decode_at(token, now)
            .map_err(VerificationError::Decode)?;

        if claims.subject.trim().is_empty() {
            return Err(VerificationError::MissingSubject);
        }

        Ok(claims)
    }

    pub async fn resolve_principal<L: IdentityLookup>(
        &self,
        token: &str,
        identities: &L,
    ) -> Result<Principal, AuthError> {
        self.resolve_principal_at(token, identities, unix_now())
            .await
    }

    /// Verify the token and look up its subject. A bad token and an unknown
    /// subject produce the same `Unauthenticated` error.
    pub async fn resolve_principal_at<L: IdentityLookup>(
        &self,
        token: &str,
        identities: &L,
        now: u64,
    ) -> Result<Principal, AuthError> {
        let claims = self
            .verify_at(token, now)
            .map_err(|e| AuthError::Unauthenticated(Rejection::Verification(e)))?;

        identities
            .lookup(&claims.subject)
            .await
            .map_err(AuthError::Lookup)?
            .ok_or(AuthError::Unauthenticated(Rejection::UnknownPrincipal))
    }
}

/// Errors from `SessionVerifier::verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    Decode(DecodeError),
    /// Token verified but carries no subject
    MissingSubject,
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationError::Decode(e) => write!(f, "{}", e),
            VerificationError::MissingSubject => write!(f, "Token has no subject"),
        }
    }
}

impl std::error::Error for VerificationError {}

/// Fine-grained reason behind an `Unauthenticated` result. Logged, never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Verification(VerificationError),
    /// Subject has no matching identity record
    UnknownPrincipal,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Verification(e) => write!(f, "{}", e),
            Rejection::UnknownPrincipal => write!(f, "Unknown principal"),
        }
    }
}

/// Errors from `SessionVerifier::resolve_principal`.
#[derive(Debug)]
pub enum AuthError {
    Unauthenticated(Rejection),
    /// The identity store failed; not an authentication decision
    Lookup(LookupError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthenticated(reason) => write!(f, "Unauthenticated: {}", reason),
            AuthError::Lookup(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthError {}
