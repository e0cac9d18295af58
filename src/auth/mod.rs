//! Cookie-carried session authentication.
//!
//! Access tokens (short-lived) and refresh tokens (long-lived) travel in two
//! HttpOnly cookies. Protected endpoints accept only the access token; the
//! client trades its refresh token for a new access token explicitly.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;

pub use cookie::{ACCESS_COOKIE_NAME, CookieDirective, REFRESH_COOKIE_NAME, get_cookie};
pub use extractors::CurrentPrincipal;
pub use ip::{ClientIpHeader, extract_client_ip};
pub use state::HasSession;
