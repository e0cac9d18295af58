//! Token settings validated once at startup.
//!
//! A `TokenConfig` is immutable after construction and is handed to the codec,
//! issuer and verifier by value. Nothing reads token settings from globals.

use std::fmt;
use std::str::FromStr;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default access token lifetime: 30 minutes.
pub const DEFAULT_ACCESS_TTL_MINUTES: u64 = 30;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_DAYS: u64 = 7;

/// HMAC signing algorithms usable with a single shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::HS256 => "HS256",
            SigningAlgorithm::HS384 => "HS384",
            SigningAlgorithm::HS512 => "HS512",
        }
    }

    pub(crate) fn to_jwt(self) -> jsonwebtoken::Algorithm {
        match self {
            SigningAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            SigningAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            SigningAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::HS256),
            "HS384" => Ok(SigningAlgorithm::HS384),
            "HS512" => Ok(SigningAlgorithm::HS512),
            _ => Err(ConfigError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated token settings.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    leeway_secs: u64,
}

impl TokenConfig {
    /// Build a config with the default algorithm and lifetimes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        TokenConfigBuilder::new(secret).build()
    }

    pub fn builder(secret: impl Into<Vec<u8>>) -> TokenConfigBuilder {
        TokenConfigBuilder::new(secret)
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    /// Clock skew tolerated when checking expiry, in seconds.
    pub fn leeway_secs(&self) -> u64 {
        self.leeway_secs
    }
}

// Keep the secret out of debug output.
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Builder mirroring the recognized configuration options.
pub struct TokenConfigBuilder {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
    access_ttl_minutes: u64,
    refresh_ttl_days: u64,
    leeway_secs: u64,
}

impl TokenConfigBuilder {
    fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: SigningAlgorithm::default(),
            access_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            leeway_secs: 0,
        }
    }

    pub fn algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn access_ttl_minutes(mut self, minutes: u64) -> Self {
        self.access_ttl_minutes = minutes;
        self
    }

    pub fn refresh_ttl_days(mut self, days: u64) -> Self {
        self.refresh_ttl_days = days;
        self
    }

    pub fn leeway_secs(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    pub fn build(self) -> Result<TokenConfig, ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_LENGTH,
            });
        }

        let access_ttl_secs = self
            .access_ttl_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTtl("access_ttl_minutes"))?;
        let refresh_ttl_secs = self
            .refresh_ttl_days
            .checked_mul(24 * 60 * 60)
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTtl("refresh_ttl_days"))?;

        Ok(TokenConfig {
            secret: self.secret,
            algorithm: self.algorithm,
            access_ttl_secs,
            refresh_ttl_secs,
            leeway_secs: self.leeway_secs,
        })
    }
}

/// Errors that prevent the token settings from being used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No signing secret was supplied
    MissingSecret,
    /// Signing secret is shorter than the accepted minimum
    SecretTooShort { min: usize },
    /// Algorithm is not an HMAC algorithm this crate signs with
    UnsupportedAlgorithm(String),
    /// A lifetime was zero or overflowed
    InvalidTtl(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSecret => write!(f, "Signing secret is required"),
            ConfigError::SecretTooShort { min } => {
                write!(f, "Signing secret must be at least {} bytes", min)
            }
            ConfigError::UnsupportedAlgorithm(alg) => {
                write!(f, "Unsupported signing algorithm: {}", alg)
            }
            ConfigError::InvalidTtl(name) => write!(f, "Invalid token lifetime: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}
