mod session;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::rate_limit::LoginRateLimit;
use crate::session::SessionProtocol;

pub use session::SessionState;

/// Create the API router.
pub fn create_api_router(
    session: Arc<SessionProtocol<Database>>,
    login_limit: Option<LoginRateLimit>,
) -> Router {
    session::router(SessionState { session }, login_limit)
}
