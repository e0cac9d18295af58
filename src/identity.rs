//! Principals and the identity lookup seam.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;

use crate::db::Database;

/// An authenticated identity. Safe to return to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    /// Serialized as `full_name`, the field the web client reads.
    #[serde(rename = "full_name")]
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Finds the principal registered under a username.
///
/// `Ok(None)` means no such user. Implementations may always miss.
pub trait IdentityLookup: Send + Sync {
    fn lookup(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Principal>, LookupError>> + Send;
}

impl IdentityLookup for Database {
    async fn lookup(&self, username: &str) -> Result<Option<Principal>, LookupError> {
        Ok(self.users().get_by_username(username).await?)
    }
}

/// Fixed in-memory directory of principals.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: HashMap<String, Principal>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, principal: Principal) -> Self {
        self.insert(principal);
        self
    }

    pub fn insert(&mut self, principal: Principal) {
        self.users.insert(principal.username.clone(), principal);
    }
}

impl IdentityLookup for StaticDirectory {
    fn lookup(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Principal>, LookupError>> + Send {
        std::future::ready(Ok(self.users.get(username).cloned()))
    }
}

/// The identity store could not be queried.
#[derive(Debug)]
pub struct LookupError(Box<dyn std::error::Error + Send + Sync>);

impl From<sqlx::Error> for LookupError {
    fn from(e: sqlx::Error) -> Self {
        Self(Box::new(e))
    }
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity lookup failed: {}", self.0)
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}
