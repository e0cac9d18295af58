//! CLI argument parsing, validation, and startup helpers.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clap::Parser;
use tracing::{error, info, warn};

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::config::{
    DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS, SigningAlgorithm, TokenConfig,
};
use crate::db::{Database, NewUser};

/// Environment variable holding the signing secret.
pub const SECRET_ENV_VAR: &str = "SECRET_KEY";

/// Size of secrets produced by `--generate-secret`, in bytes.
const GENERATED_SECRET_BYTES: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokenjar",
    about = "Session tokens in HttpOnly cookies: login, refresh, logout, whoami"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file holding the users
    #[arg(short, long, default_value = "tokenjar.db")]
    pub database: String,

    /// Path to file containing the signing secret. Prefer the SECRET_KEY env var instead
    #[arg(long)]
    pub secret_file: Option<String>,

    /// Token signing algorithm (HS256, HS384 or HS512)
    #[arg(long, env = "ALGORITHM", default_value = "HS256", value_parser = parse_algorithm)]
    pub algorithm: SigningAlgorithm,

    /// Access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = DEFAULT_ACCESS_TTL_MINUTES)]
    pub access_ttl_minutes: u64,

    /// Refresh token lifetime in days
    #[arg(long, env = "REFRESH_TOKEN_EXPIRE_DAYS", default_value_t = DEFAULT_REFRESH_TTL_DAYS)]
    pub refresh_ttl_days: u64,

    /// Seconds of clock skew tolerated when checking token expiry
    #[arg(long, env = "TOKEN_LEEWAY_SECS", default_value_t = 0)]
    pub leeway_secs: u64,

    /// Send cookies without the Secure flag. Only for plain-HTTP local development
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Login attempts allowed per minute per client IP (0 disables the limit)
    #[arg(long, default_value_t = 10)]
    pub login_rate_limit: u32,

    /// Read the client IP from this proxy header instead of the socket address
    #[arg(long, value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Create a user with this username on startup (skipped if it already exists)
    #[arg(long)]
    pub create_user: Option<String>,

    /// Display name for --create-user
    #[arg(long, requires = "create_user")]
    pub display_name: Option<String>,

    /// Email for --create-user
    #[arg(long, requires = "create_user")]
    pub email: Option<String>,

    /// Print a new random signing secret and exit
    #[arg(long)]
    pub generate_secret: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_algorithm(s: &str) -> Result<SigningAlgorithm, String> {
    s.parse().map_err(|e: crate::config::ConfigError| e.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing secret from the environment or a file.
/// Returns None and logs an error if no secret is available.
///
/// Must be called before the async runtime or any other thread is started,
/// since it removes the variable from the process environment.
pub fn load_secret(secret_file: Option<&str>) -> Option<Vec<u8>> {
    if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
        // Clear the environment variable to prevent leaking
        // SAFETY: callers run this on the main thread before spawning any
        // other thread, so nothing reads the environment concurrently.
        unsafe { std::env::remove_var(SECRET_ENV_VAR) };
        return Some(secret.into_bytes());
    }

    let Some(path) = secret_file else {
        error!(
            "Signing secret is required. Set {} environment variable (recommended) or use --secret-file",
            SECRET_ENV_VAR
        );
        return None;
    };

    read_secret_file(path)
}

fn read_secret_file(path: &str) -> Option<Vec<u8>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content.trim().as_bytes().to_vec()),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read secret file");
            None
        }
    }
}

/// Validate the token settings. Returns None and logs an error if they are unusable.
pub fn build_token_config(args: &Args, secret: Vec<u8>) -> Option<TokenConfig> {
    TokenConfig::builder(secret)
        .algorithm(args.algorithm)
        .access_ttl_minutes(args.access_ttl_minutes)
        .refresh_ttl_days(args.refresh_ttl_days)
        .leeway_secs(args.leeway_secs)
        .build()
        .inspect_err(|e| error!(error = %e, "Invalid token configuration"))
        .ok()
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, token: TokenConfig) -> ServerConfig {
    if args.insecure_cookies {
        warn!("Cookies are sent without the Secure flag. Do not use this in production");
    }

    ServerConfig {
        db,
        token,
        secure_cookies: !args.insecure_cookies,
        login_rate_limit: NonZeroU32::new(args.login_rate_limit),
        ip_header: args.ip_header,
    }
}

/// Generate a random signing secret, base64url-encoded.
pub fn generate_secret() -> String {
    let mut key = [0u8; GENERATED_SECRET_BYTES];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut key);
    URL_SAFE_NO_PAD.encode(key)
}

/// Handle the --create-user flag: create the user unless the username is taken.
pub async fn handle_create_user(
    db: &Database,
    username: &str,
    display_name: Option<&str>,
    email: Option<&str>,
) {
    match db.users().get_by_username(username).await {
        Ok(Some(_)) => {
            info!(username = %username, "User already exists");
        }
        Ok(None) => {
            let user = NewUser {
                username,
                display_name,
                email,
            };
            match db.users().create(&user).await {
                Ok(_) => info!(username = %username, "User created"),
                Err(e) => {
                    error!(username = %username, error = %e, "Failed to create user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
