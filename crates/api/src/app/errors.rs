use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use warden_core::AuthError;
use warden_perm::PermissionError;

/// Everything a handler or middleware can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credentials could not be turned into a token.
    #[error("login failed: {0}")]
    Login(#[source] AuthError),

    /// The presented token could not be restored.
    #[error("session rejected: {0}")]
    Session(#[source] AuthError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            warn!(error = %self, status = status.as_u16(), "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        match self {
            ApiError::Permission(PermissionError::Forbidden { permission, result }) => (
                status,
                axum::Json(json!({
                    "error": code,
                    "message": format!("permission '{permission}' was not granted"),
                    "permission": permission,
                    "voter_results": result.voter_results(),
                })),
            )
                .into_response(),
            // Auth failures carry no detail beyond the code.
            ApiError::Login(_) | ApiError::Session(_) if status == StatusCode::UNAUTHORIZED => {
                json_error(status, code, "authentication required")
            }
            other => json_error(status, code, other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Login(err) => login_status(err),
            ApiError::Session(err) => session_status(err),
            ApiError::Permission(PermissionError::Forbidden { .. }) => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            ApiError::Permission(PermissionError::Voter(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "permission_check_failed")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

fn login_status(err: &AuthError) -> (StatusCode, &'static str) {
    match err {
        AuthError::AuthDataNotSupported | AuthError::NoUserData | AuthError::Rejected(_) => {
            (StatusCode::UNAUTHORIZED, "invalid_credentials")
        }
        AuthError::MalformedAuthData(_) => (StatusCode::BAD_REQUEST, "malformed_credentials"),
        AuthError::OAuth2StateMismatch => (StatusCode::BAD_REQUEST, "oauth2_state_mismatch"),
        AuthError::ProviderFailed(_) | AuthError::OAuth2TokenExchange(_) => {
            (StatusCode::BAD_GATEWAY, "provider_failed")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

fn session_status(err: &AuthError) -> (StatusCode, &'static str) {
    match err {
        AuthError::NotConfigured(_) | AuthError::Other(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
        AuthError::ProviderFailed(_) => (StatusCode::BAD_GATEWAY, "provider_failed"),
        _ => (StatusCode::UNAUTHORIZED, "invalid_token"),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
