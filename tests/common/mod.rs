#![allow(dead_code)]

use std::num::NonZeroU32;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tokenjar::{
    ServerConfig,
    auth::ClientIpHeader,
    config::TokenConfig,
    create_app,
    db::{Database, NewUser},
};

pub const TEST_SECRET: &[u8] = b"test-signing-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub token: TokenConfig,
}

/// Options for building a test app. Defaults: plain-HTTP cookies, no login throttling.
#[derive(Default)]
pub struct TestOptions {
    pub secure_cookies: bool,
    pub login_rate_limit: Option<NonZeroU32>,
    pub ip_header: Option<ClientIpHeader>,
}

/// Create a test app backed by an in-memory database with `johndoe` registered.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(TestOptions::default()).await
}

pub async fn create_test_app_with(options: TestOptions) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    db.users()
        .create(&NewUser {
            username: "johndoe",
            display_name: Some("John Doe"),
            email: Some("johndoe@example.com"),
        })
        .await
        .expect("Failed to create test user");

    let token = TokenConfig::new(TEST_SECRET).expect("Invalid test token config");
    let config = ServerConfig {
        db: db.clone(),
        token: token.clone(),
        secure_cookies: options.secure_cookies,
        login_rate_limit: options.login_rate_limit,
        ip_header: options.ip_header,
    };

    TestApp {
        app: create_app(&config),
        db,
        token,
    }
}

pub fn login_request(username: &str) -> Request<Body> {
    json_post("/api/login", &serde_json::json!({ "username": username }))
}

pub fn json_post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// All `Set-Cookie` header values, in order.
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` value for the named cookie.
pub fn find_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .find(|c| c.starts_with(&prefix))
        .map(String::as_str)
}

/// The value part of a `Set-Cookie` header (`name=value; ...`).
pub fn cookie_value(set_cookie: &str) -> &str {
    let pair = set_cookie.split(';').next().unwrap();
    pair.split_once('=').unwrap().1
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
