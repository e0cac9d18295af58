//! HTTP rendering of session failures.
//!
//! Every failure of one kind renders identically: same status, same body, no
//! cookies touched. A client answered with 401 can still try `/refresh`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::session::SessionError;

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

fn status_code(error: SessionError) -> StatusCode {
    match error {
        SessionError::Unauthorized | SessionError::Unauthenticated => StatusCode::UNAUTHORIZED,
        SessionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message(error: SessionError) -> &'static str {
    match error {
        SessionError::Unauthorized => "Unauthorized",
        SessionError::Unauthenticated => "Not authenticated",
        SessionError::Internal => "Internal server error",
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (
            status_code(self),
            Json(ErrorResponse {
                error: message(self),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_response() {
        let response = SessionError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("set-cookie").is_none());
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Not authenticated" })
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = SessionError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Unauthorized" })
        );
    }

    #[test]
    fn test_internal_response() {
        let response = SessionError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
