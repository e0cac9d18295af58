//! Session API endpoints.
//!
//! - POST `/login` - Issue access and refresh cookies for a known user
//! - POST `/refresh` - Exchange the refresh cookie for a new access cookie
//! - POST `/logout` - Clear both cookies
//! - GET `/users/me` - Current user, from the access cookie

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{CurrentPrincipal, HasSession, REFRESH_COOKIE_NAME, get_cookie};
use crate::db::Database;
use crate::rate_limit::{LoginRateLimit, rate_limit_login};
use crate::session::{Credentials, SessionError, SessionProtocol, SessionUpdate};

#[derive(Clone)]
pub struct SessionState {
    pub session: Arc<SessionProtocol<Database>>,
}

impl HasSession for SessionState {
    type Identities = Database;

    fn session(&self) -> &SessionProtocol<Database> {
        &self.session
    }
}

pub fn router(state: SessionState, login_limit: Option<LoginRateLimit>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone());

    let login_router = match login_limit {
        Some(limit) => login_router.layer(middleware::from_fn_with_state(limit, rate_limit_login)),
        None => login_router,
    };

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/users/me", get(read_users_me))
        .with_state(state)
        .merge(login_router)
}

/// Acknowledge the update and send its cookies as separate `Set-Cookie` headers.
fn session_response(update: SessionUpdate) -> Response {
    let cookies: Vec<_> = update
        .cookies
        .iter()
        .map(|cookie| (SET_COOKIE, cookie.to_header_value()))
        .collect();

    (
        StatusCode::OK,
        AppendHeaders(cookies),
        Json(update.acknowledgement()),
    )
        .into_response()
}

/// An unreadable body is refused like unknown credentials; the parse error is only logged.
async fn login(
    State(state): State<SessionState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, SessionError> {
    let Json(credentials) = payload.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Login rejected: unreadable body");
        SessionError::Unauthorized
    })?;

    let update = state.session.login(&credentials).await?;
    Ok(session_response(update))
}

async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<Response, SessionError> {
    let update = state
        .session
        .refresh(get_cookie(&headers, REFRESH_COOKIE_NAME))?;
    Ok(session_response(update))
}

async fn logout(State(state): State<SessionState>) -> Response {
    session_response(state.session.logout())
}

async fn read_users_me(CurrentPrincipal(principal): CurrentPrincipal) -> impl IntoResponse {
    Json(principal)
}
