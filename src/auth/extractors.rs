//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::state::HasSession;
use crate::identity::Principal;
use crate::session::SessionError;

/// Gate for protected endpoints: resolves the access cookie to a principal.
/// Rejects with 401 `Not authenticated` for a missing, invalid or expired
/// token and for a subject that no longer exists.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: HasSession + Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let access_token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME);
        state
            .session()
            .whoami(access_token)
            .await
            .map(CurrentPrincipal)
    }
}
