//! Session cookie parsing and `Set-Cookie` rendering.

use axum::http::header;

/// Cookie name for the access token (short-lived).
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token (long-lived).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// One `Set-Cookie` instruction for the client.
///
/// Always `HttpOnly`, `SameSite=Lax` and `Path=/`. `Max-Age` equals the token
/// lifetime, or zero when the cookie is being removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: &'static str,
    pub value: String,
    pub max_age_secs: u64,
    pub secure: bool,
}

impl CookieDirective {
    pub fn set(name: &'static str, value: String, max_age_secs: u64, secure: bool) -> Self {
        Self {
            name,
            value,
            max_age_secs,
            secure,
        }
    }

    pub fn clear(name: &'static str, secure: bool) -> Self {
        Self {
            name,
            value: String::new(),
            max_age_secs: 0,
            secure,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.max_age_secs == 0
    }

    pub fn to_header_value(&self) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
            self.name, self.value, self.max_age_secs, secure
        )
    }
}
