//! Login, refresh, logout and whoami over cookie-held tokens.
//!
//! A session is either anonymous or authenticated as one subject; the state
//! lives entirely in the client's cookies. Every operation is a single
//! request/response and shares no mutable state with any other.
//!
//! Refresh tokens are not rotated on use and nothing is revoked server-side:
//! logout only tells the client to drop its cookies, so a copied token stays
//! valid until its expiry.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::auth::{ACCESS_COOKIE_NAME, CookieDirective, REFRESH_COOKIE_NAME};
use crate::config::TokenConfig;
use crate::identity::{IdentityLookup, Principal};
use crate::issuer::{IssueError, TokenIssuer};
use crate::jwt::unix_now;
use crate::verifier::{AuthError, SessionVerifier};

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    /// Accepted for client compatibility; not checked.
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: None,
        }
    }
}

/// Successful outcome: an acknowledgement and the cookies to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub message: &'static str,
    pub cookies: Vec<CookieDirective>,
}

impl SessionUpdate {
    pub fn cookie(&self, name: &str) -> Option<&CookieDirective> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn acknowledgement(&self) -> Acknowledgement {
        Acknowledgement {
            message: self.message,
        }
    }
}

/// Response body for login, refresh and logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
}

/// What the client is told when an operation fails. The internal reason is
/// only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Login or refresh refused
    Unauthorized,
    /// Protected resource requested without a usable access token
    Unauthenticated,
    /// Identity store or signing failure
    Internal,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Unauthorized => write!(f, "Unauthorized"),
            SessionError::Unauthenticated => write!(f, "Not authenticated"),
            SessionError::Internal => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Orchestrates the issuer, verifier and identity store.
pub struct SessionProtocol<L> {
    issuer: TokenIssuer,
    verifier: SessionVerifier,
    identities: L,
    secure_cookies: bool,
}

impl<L: IdentityLookup> SessionProtocol<L> {
    /// `secure_cookies` has no default: callers decide whether cookies carry `Secure`.
    pub fn new(config: &TokenConfig, identities: L, secure_cookies: bool) -> Self {
        Self {
            issuer: TokenIssuer::new(config),
            verifier: SessionVerifier::new(config),
            identities,
            secure_cookies,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<SessionUpdate, SessionError> {
        self.login_at(credentials, unix_now()).await
    }

    /// Anonymous to authenticated: sets both cookies.
    pub async fn login_at(
        &self,
        credentials: &Credentials,
        now: u64,
    ) -> Result<SessionUpdate, SessionError> {
        let username = credentials
            .username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                debug!("Login rejected: no username");
                SessionError::Unauthorized
            })?;

        let principal = self
            .identities
            .lookup(username)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up user");
                SessionError::Internal
            })?
            .ok_or_else(|| {
                debug!("Login rejected: invalid credentials");
                SessionError::Unauthorized
            })?;

        let access = self
            .issuer
            .issue_access_at(&principal.username, now)
            .map_err(issue_failure)?;
        let refresh = self
            .issuer
            .issue_refresh_at(&principal.username, now)
            .map_err(issue_failure)?;

        info!(username = %principal.username, "Login successful");

        Ok(SessionUpdate {
            message: "Login successful",
            cookies: vec![
                CookieDirective::set(
                    ACCESS_COOKIE_NAME,
                    access.token,
                    access.ttl_secs,
                    self.secure_cookies,
                ),
                CookieDirective::set(
                    REFRESH_COOKIE_NAME,
                    refresh.token,
                    refresh.ttl_secs,
                    self.secure_cookies,
                ),
            ],
        })
    }

    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<SessionUpdate, SessionError> {
        self.refresh_at(refresh_token, unix_now())
    }

    /// Mint a new access token from a valid refresh token. The refresh token
    /// itself is left untouched.
    pub fn refresh_at(
        &self,
        refresh_token: Option<&str>,
        now: u64,
    ) -> Result<SessionUpdate, SessionError> {
        let refresh_token = refresh_token.ok_or_else(|| {
            debug!("Refresh rejected: no refresh token");
            SessionError::Unauthorized
        })?;

        let claims = self.verifier.verify_at(refresh_token, now).map_err(|e| {
            debug!(reason = %e, "Refresh rejected");
            SessionError::Unauthorized
        })?;

        let access = self
            .issuer
            .issue_access_at(&claims.subject, now)
            .map_err(issue_failure)?;

        debug!(username = %claims.subject, "Access token refreshed");

        Ok(SessionUpdate {
            message: "Token refreshed",
            cookies: vec![CookieDirective::set(
                ACCESS_COOKIE_NAME,
                access.token,
                access.ttl_secs,
                self.secure_cookies,
            )],
        })
    }

    /// Tell the client to drop both cookies. Never fails.
    pub fn logout(&self) -> SessionUpdate {
        SessionUpdate {
            message: "Logout successful",
            cookies: vec![
                CookieDirective::clear(ACCESS_COOKIE_NAME, self.secure_cookies),
                CookieDirective::clear(REFRESH_COOKIE_NAME, self.secure_cookies),
            ],
        }
    }

    pub async fn whoami(&self, access_token: Option<&str>) -> Result<Principal, SessionError> {
        self.whoami_at(access_token, unix_now()).await
    }

    /// Resolve the access token to its principal.
    pub async fn whoami_at(
        &self,
        access_token: Option<&str>,
        now: u64,
    ) -> Result<Principal, SessionError> {
        let access_token = access_token.ok_or_else(|| {
            debug!("Request rejected: no access token");
            SessionError::Unauthenticated
        })?;

        self.verifier
            .resolve_principal_at(access_token, &self.identities, now)
            .await
            .map_err(|e| match e {
                AuthError::Unauthenticated(reason) => {
                    debug!(reason = %reason, "Request rejected");
                    SessionError::Unauthenticated
                }
                AuthError::Lookup(e) => {
                    error!(error = %e, "Failed to look up user");
                    SessionError::Internal
                }
            })
    }
}

fn issue_failure(e: IssueError) -> SessionError {
    match e {
        IssueError::InvalidSubject => {
            debug!("Token refused for blank subject");
            SessionError::Unauthorized
        }
        IssueError::Encoding(e) => {
            error!(error = %e, "Failed to issue token");
            SessionError::Internal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticDirectory;
    use crate::jwt::{Claims, TokenCodec};

    const SECRET: &[u8] = b"test-secret-key-for-testing-0123456789";
    const NOW: u64 = 1_700_000_000;
    const ACCESS_TTL: u64 = 30 * 60;

    fn config() -> TokenConfig {
        TokenConfig::new(SECRET).unwrap()
    }

    fn protocol() -> SessionProtocol<StaticDirectory> {
        let directory = StaticDirectory::new().with(
            Principal::new("johndoe")
                .with_display_name("John Doe")
                .with_email("johndoe@example.com"),
        );
        SessionProtocol::new(&config(), directory, true)
    }

    fn cookie_value<'a>(update: &'a SessionUpdate, name: &str) -> &'a str {
        &update.cookie(name).unwrap().value
    }

    #[tokio::test]
    async fn test_login_sets_both_cookies() {
        let protocol = protocol();
        let codec = TokenCodec::new(&config());

        let update = protocol
            .login_at(&Credentials::username("johndoe"), NOW)
            .await
            .unwrap();
        assert_eq!(update.message, "Login successful");
        assert_eq!(update.cookies.len(), 2);

        let access = update.cookie(ACCESS_COOKIE_NAME).unwrap();
        let refresh = update.cookie(REFRESH_COOKIE_NAME).unwrap();
        assert_eq!(access.max_age_secs, ACCESS_TTL);
        assert_eq!(refresh.max_age_secs, 7 * 24 * 60 * 60);
        assert!(access.secure && refresh.secure);

        let access_claims = codec.decode_at(&access.value, NOW).unwrap();
        let refresh_claims = codec.decode_at(&refresh.value, NOW).unwrap();
        assert_eq!(access_claims.subject, "johndoe");
        assert_eq!(access_claims.subject, refresh_claims.subject);
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let result = protocol()
            .login_at(&Credentials::username("janedoe"), NOW)
            .await;
        assert_eq!(result, Err(SessionError::Unauthorized));
    }

    #[tokio::test]
    async fn test_login_without_username() {
        let protocol = protocol();
        assert_eq!(
            protocol.login_at(&Credentials::default(), NOW).await,
            Err(SessionError::Unauthorized)
        );
        assert_eq!(
            protocol.login_at(&Credentials::username("  "), NOW).await,
            Err(SessionError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_login_ignores_password() {
        let credentials = Credentials {
            username: Some("johndoe".to_string()),
            password: Some("anything".to_string()),
        };
        assert!(protocol().login_at(&credentials, NOW).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_only() {
        let protocol = protocol();
        let codec = TokenCodec::new(&config());
        let login = protocol
            .login_at(&Credentials::username("johndoe"), NOW)
            .await
            .unwrap();

        let later = NOW + 3600;
        let update = protocol
            .refresh_at(Some(cookie_value(&login, REFRESH_COOKIE_NAME)), later)
            .unwrap();
        assert_eq!(update.message, "Token refreshed");
        assert_eq!(update.cookies.len(), 1);
        assert!(update.cookie(REFRESH_COOKIE_NAME).is_none());

        let claims = codec
            .decode_at(cookie_value(&update, ACCESS_COOKIE_NAME), later)
            .unwrap();
        assert_eq!(claims.subject, "johndoe");
        assert_eq!(claims.expires_at, later + ACCESS_TTL);
        assert!(claims.expires_at > later);
    }

    #[test]
    fn test_refresh_without_cookie() {
        assert_eq!(
            protocol().refresh_at(None, NOW),
            Err(SessionError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_refresh_with_bad_tokens() {
        let protocol = protocol();
        let login = protocol
            .login_at(&Credentials::username("johndoe"), NOW)
            .await
            .unwrap();
        let refresh = cookie_value(&login, REFRESH_COOKIE_NAME);

        let expired = NOW + 8 * 24 * 60 * 60;
        assert_eq!(
            protocol.refresh_at(Some(refresh), expired),
            Err(SessionError::Unauthorized)
        );
        assert_eq!(
            protocol.refresh_at(Some("garbage"), NOW),
            Err(SessionError::Unauthorized)
        );

        let no_subject = TokenCodec::new(&config())
            .encode(&Claims::new("", NOW + 60))
            .unwrap();
        assert_eq!(
            protocol.refresh_at(Some(&no_subject), NOW),
            Err(SessionError::Unauthorized)
        );
    }

    #[test]
    fn test_logout_clears_both_cookies() {
        let update = protocol().logout();
        assert_eq!(update.message, "Logout successful");
        assert_eq!(update.cookies.len(), 2);
        assert!(update.cookies.iter().all(|c| c.is_removal()));
        assert!(update.cookie(ACCESS_COOKIE_NAME).is_some());
        assert!(update.cookie(REFRESH_COOKIE_NAME).is_some());
    }

    #[tokio::test]
    async fn test_whoami_failures_are_identical() {
        let protocol = protocol();
        let login = protocol
            .login_at(&Credentials::username("johndoe"), NOW)
            .await
            .unwrap();
        let access = cookie_value(&login, ACCESS_COOKIE_NAME);
        let tampered = format!("{}A", access);

        let missing = protocol.whoami_at(None, NOW).await;
        let expired = protocol.whoami_at(Some(access), NOW + ACCESS_TTL).await;
        let forged = protocol.whoami_at(Some(&tampered), NOW).await;

        assert_eq!(missing, Err(SessionError::Unauthenticated));
        assert_eq!(expired, missing);
        assert_eq!(forged, missing);
    }

    #[tokio::test]
    async fn test_whoami_unknown_subject() {
        let protocol = protocol();
        let token = protocol.issuer().issue_access_at("ghost", NOW).unwrap();

        assert_eq!(
            protocol.whoami_at(Some(&token.token), NOW).await,
            Err(SessionError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let protocol = protocol();

        let login = protocol
            .login_at(&Credentials::username("johndoe"), NOW)
            .await
            .unwrap();
        let access = cookie_value(&login, ACCESS_COOKIE_NAME).to_string();
        let refresh = cookie_value(&login, REFRESH_COOKIE_NAME).to_string();

        let me = protocol.whoami_at(Some(&access), NOW + 1).await.unwrap();
        assert_eq!(me.username, "johndoe");
        assert_eq!(me.display_name.as_deref(), Some("John Doe"));

        let after_ttl = NOW + ACCESS_TTL + 1;
        assert_eq!(
            protocol.whoami_at(Some(&access), after_ttl).await,
            Err(SessionError::Unauthenticated)
        );

        let refreshed = protocol.refresh_at(Some(&refresh), after_ttl).unwrap();
        let new_access = cookie_value(&refreshed, ACCESS_COOKIE_NAME);

        let me = protocol
            .whoami_at(Some(new_access), after_ttl)
            .await
            .unwrap();
        assert_eq!(me.username, "johndoe");
    }
}
