pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod identity;
pub mod issuer;
pub mod jwt;
pub mod rate_limit;
pub mod session;
pub mod verifier;

use api::create_api_router;
use auth::ClientIpHeader;
use axum::{Json, Router, routing::get};
use config::TokenConfig;
use db::Database;
use rate_limit::LoginRateLimit;
use session::SessionProtocol;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Identity store (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret, algorithm and token lifetimes
    pub token: TokenConfig,
    /// Whether to set Secure flag on cookies. Must be true outside local development.
    pub secure_cookies: bool,
    /// Login attempts allowed per minute per client IP; None disables throttling
    pub login_rate_limit: Option<NonZeroU32>,
    /// Proxy header carrying the client IP (requires running behind a proxy)
    pub ip_header: Option<ClientIpHeader>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let session = Arc::new(SessionProtocol::new(
        &config.token,
        config.db.clone(),
        config.secure_cookies,
    ));

    let login_limit = config
        .login_rate_limit
        .map(|attempts| LoginRateLimit::per_minute(attempts, config.ip_header));

    Router::new()
        .route("/", get(health))
        .nest("/api", create_api_router(session, login_limit))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "Backend is running" }))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
