//! Access and refresh token issuance.

use crate::config::TokenConfig;
use crate::jwt::{Claims, EncodeError, TokenCodec, unix_now};

/// Which lifetime a token was minted with. Not encoded in the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A freshly minted token and its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub kind: TokenKind,
    /// The signed token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub ttl_secs: u64,
}

/// Builds claim sets with the configured lifetimes and signs them.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            codec: TokenCodec::new(config),
            access_ttl_secs: config.access_ttl_secs(),
            refresh_ttl_secs: config.refresh_ttl_secs(),
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    pub fn issue_access(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue_access_at(subject, unix_now())
    }

    pub fn issue_refresh(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue_refresh_at(subject, unix_now())
    }

    /// Issue an access token as of `now` (Unix seconds).
    pub fn issue_access_at(&self, subject: &str, now: u64) -> Result<IssuedToken, IssueError> {
        self.issue(TokenKind::Access, subject, now, self.access_ttl_secs)
    }

    /// Issue a refresh token as of `now` (Unix seconds).
    pub fn issue_refresh_at(&self, subject: &str, now: u64) -> Result<IssuedToken, IssueError> {
        self.issue(TokenKind::Refresh, subject, now, self.refresh_ttl_secs)
    }

    fn issue(
        &self,
        kind: TokenKind,
        subject: &str,
        now: u64,
        ttl_secs: u64,
    ) -> Result<IssuedToken, IssueError> {
        if subject.trim().is_empty() {
            return Err(IssueError::InvalidSubject);
        }

        let expires_at = now.saturating_add(ttl_secs);
        let token = self
            .codec
            .encode(&Claims::new(subject, expires_at))
            .map_err(IssueError::Encoding)?;

        Ok(IssuedToken {
            kind,
            token,
            expires_at,
            ttl_secs,
        })
    }
}

/// Errors that can occur while issuing a token.
#[derive(Debug)]
pub enum IssueError {
    /// Subject was empty or whitespace-only
    InvalidSubject,
    /// Error encoding the token
    Encoding(EncodeError),
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueError::InvalidSubject => write!(f, "Token subject must not be empty"),
            IssueError::Encoding(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IssueError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-testing-0123456789";
    const NOW: u64 = 1_700_000_000;

    fn setup() -> (TokenIssuer, TokenCodec) {
        let config = TokenConfig::new(SECRET).unwrap();
        (TokenIssuer::new(&config), TokenCodec::new(&config))
    }

    #[test]
    fn test_issue_access_token() {
        let (issuer, codec) = setup();

        let issued = issuer.issue_access_at("alice", NOW).unwrap();
        assert_eq!(issued.kind, TokenKind::Access);
        assert_eq!(issued.ttl_secs, 30 * 60);
        assert_eq!(issued.expires_at, NOW + 30 * 60);

        let claims = codec.decode_at(&issued.token, NOW).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.expires_at, issued.expires_at);
    }

    #[test]
    fn test_issue_refresh_token() {
        let (issuer, codec) = setup();

        let issued = issuer.issue_refresh_at("alice", NOW).unwrap();
        assert_eq!(issued.kind, TokenKind::Refresh);
        assert_eq!(issued.ttl_secs, 7 * 24 * 60 * 60);

        let claims = codec.decode_at(&issued.token, NOW).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.expires_at, NOW + 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_custom_lifetimes() {
        let config = TokenConfig::builder(SECRET)
            .access_ttl_minutes(1)
            .refresh_ttl_days(1)
            .build()
            .unwrap();
        let issuer = TokenIssuer::new(&config);

        assert_eq!(issuer.issue_access_at("alice", NOW).unwrap().expires_at, NOW + 60);
        assert_eq!(
            issuer.issue_refresh_at("alice", NOW).unwrap().expires_at,
            NOW + 86400
        );
    }

    #[test]
    fn test_access_token_expires_before_refresh_token() {
        let (issuer, codec) = setup();
        let access = issuer.issue_access_at("alice", NOW).unwrap();
        let refresh = issuer.issue_refresh_at("alice", NOW).unwrap();

        let later = NOW + 31 * 60;
        assert!(codec.decode_at(&access.token, later).is_err());
        assert!(codec.decode_at(&refresh.token, later).is_ok());
    }

    #[test]
    fn test_invalid_subject() {
        let (issuer, _) = setup();

        for subject in ["", " ", "\t\n"] {
            assert!(matches!(
                issuer.issue_access_at(subject, NOW),
                Err(IssueError::InvalidSubject)
            ));
            assert!(matches!(
                issuer.issue_refresh_at(subject, NOW),
                Err(IssueError::InvalidSubject)
            ));
        }
    }

    #[test]
    fn test_wall_clock_issue() {
        let (issuer, codec) = setup();
        let issued = issuer.issue_access("alice").unwrap();
        assert_eq!(codec.decode(&issued.token).unwrap().subject, "alice");
    }
}
