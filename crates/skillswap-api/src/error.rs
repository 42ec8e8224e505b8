//! API error handling
//!
//! One closed error taxonomy for every auth flow, mapped onto stable HTTP
//! statuses and machine-readable codes. Internal causes (signature library
//! details, storage errors) never reach the wire; callers only ever see the
//! envelope `{"success": false, "message": ..., "code": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Failure envelope returned on every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always false
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// Stable machine-readable code
    pub code: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Every failure an auth flow can surface to a caller
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    TokenMissing,

    #[error("Invalid token format")]
    TokenMalformed,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Invalid token type")]
    WrongTokenKind,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("User not found")]
    UserNotFound,

    #[error("An account with this email already exists")]
    UserExists,

    // Same message whether the email is unknown or the password is wrong,
    // so responses cannot be used to enumerate accounts
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Refresh token required")]
    RefreshTokenRequired,

    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    #[error("Refresh token has expired")]
    RefreshTokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::TokenMissing
            | AuthError::TokenMalformed
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::WrongTokenKind
            | AuthError::AuthenticationRequired
            | AuthError::InvalidCredentials
            | AuthError::RefreshTokenInvalid
            | AuthError::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::TokenRevoked | AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::UserExists => StatusCode::CONFLICT,
            AuthError::RefreshTokenRequired
            | AuthError::InvalidEmail
            | AuthError::WeakPassword(_)
            | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::TokenMalformed | AuthError::TokenInvalid | AuthError::WrongTokenKind => {
                "TOKEN_INVALID"
            }
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::AuthenticationRequired => "AUTH_REQUIRED",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::UserExists => "USER_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::RefreshTokenRequired => "REFRESH_TOKEN_REQUIRED",
            AuthError::RefreshTokenInvalid => "REFRESH_TOKEN_INVALID",
            AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AuthError::InvalidEmail => "INVALID_EMAIL",
            AuthError::WeakPassword(_) => "WEAK_PASSWORD",
            AuthError::MissingField(_) => "MISSING_FIELD",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // The Internal payload is for the log, not the wire
        let message = match &self {
            AuthError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error in auth flow");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody::new(message, code))).into_response()
    }
}
