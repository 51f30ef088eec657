//! Error types for the server.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qbridge_oauth::OAuthError;
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The tool dispatcher does not know the requested endpoint.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Broker or remote API error.
    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ServerError {
    /// HTTP status and error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::UnknownTool(_) => (StatusCode::BAD_REQUEST, "unknown_tool"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ServerError::OAuth(e) => match e {
                OAuthError::InvalidState => (StatusCode::BAD_REQUEST, "invalid_state"),
                OAuthError::TokenExchangeFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "token_exchange_failed")
                }
                OAuthError::NotAuthorized(_) => (StatusCode::UNAUTHORIZED, "not_authorized"),
                OAuthError::RefreshFailed(_) => (StatusCode::UNAUTHORIZED, "refresh_failed"),
                OAuthError::RemoteApi { .. } => (StatusCode::BAD_GATEWAY, "remote_api_error"),
                OAuthError::InvalidEntity(_) => (StatusCode::BAD_REQUEST, "invalid_entity"),
                OAuthError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
                OAuthError::Network(_) => (StatusCode::BAD_GATEWAY, "network_error"),
                OAuthError::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "crypto_error"),
                OAuthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
                OAuthError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServerError::from(OAuthError::InvalidState), 400, "invalid_state"),
            (
                ServerError::from(OAuthError::TokenExchangeFailed("x".into())),
                500,
                "token_exchange_failed",
            ),
            (
                ServerError::from(OAuthError::NotAuthorized("t".into())),
                401,
                "not_authorized",
            ),
            (
                ServerError::from(OAuthError::RefreshFailed("x".into())),
                401,
                "refresh_failed",
            ),
            (
                ServerError::from(OAuthError::RemoteApi {
                    status: 404,
                    body: "missing".into(),
                }),
                502,
                "remote_api_error",
            ),
            (
                ServerError::from(OAuthError::InvalidEntity("vendor".into())),
                400,
                "invalid_entity",
            ),
            (ServerError::UnknownTool("delete".into()), 400, "unknown_tool"),
        ];

        for (error, status, code) in cases {
            let (actual_status, actual_code) = error.status_and_code();
            assert_eq!(actual_status.as_u16(), status, "{error}");
            assert_eq!(actual_code, code);
        }
    }

    #[test]
    fn test_remote_error_message_carries_status_and_body() {
        let error = ServerError::from(OAuthError::RemoteApi {
            status: 404,
            body: "Object Not Found".into(),
        });
        let message = error.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("Object Not Found"));
    }
}
