//! Authentication API handlers
//!
//! HTTP endpoints for the session lifecycle: register, login, refresh,
//! logout, logout everywhere, password change, and the current-user profile.

use crate::audit::AuditContext;
use crate::auth::{
    AuthResponse, AuthenticatedUser, ChangePasswordRequest, LoginRequest, LogoutRequest,
    RefreshRequest, RefreshResponse, RegisterRequest, UserInfo,
};
use crate::error::AuthError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Plain acknowledgement response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

/// Current-user response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserInfo,
}

/// Register a new user account
///
/// Creates a student account and opens its first session. The response
/// carries both tokens; the user object never includes password material.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = state.auth().register(request, &ctx).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// Failures do not reveal whether the email exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = state.auth().login(request, &ctx).await?;

    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
///
/// The refresh token itself stays valid until its own expiry or logout.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token reissued", body = RefreshResponse),
        (status = 400, description = "Refresh token missing", body = crate::error::ErrorBody),
        (status = 401, description = "Refresh token invalid or expired", body = crate::error::ErrorBody),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = state.auth().refresh(request, &ctx).await?;

    Ok(Json(response))
}

/// Logout the current session
///
/// Revokes the presented access token; a refresh token in the body is
/// deactivated as well. An invalid refresh token does not fail the logout.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body(content = LogoutRequest, description = "Optional refresh token to deactivate"),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    let request = body.map(|Json(r)| r).unwrap_or_default();
    state.auth().logout(&user, request, &ctx).await?;

    Ok(Json(MessageResponse::ok("Logged out successfully")))
}

/// Logout everywhere
///
/// Revokes the presented access token and deactivates every refresh token
/// the caller owns.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout-all",
    tag = "auth",
    responses(
        (status = 200, description = "All sessions ended", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_all_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    state.auth().logout_all(&user, &ctx).await?;

    Ok(Json(MessageResponse::ok("Logged out from all devices")))
}

/// Change the current user's password
///
/// On success every outstanding session is invalidated; the client must log
/// in again with the new password.
#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too weak", body = crate::error::ErrorBody),
        (status = 401, description = "Current password wrong", body = crate::error::ErrorBody),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let ctx = AuditContext::from_headers(&headers);
    state.auth().change_password(&user, request, &ctx).await?;

    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = MeResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state.auth().me(user.id).await?;

    Ok(Json(MeResponse {
        success: true,
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_serialization() {
        let response = MessageResponse::ok("Logged out successfully");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("Logged out successfully"));
    }
}
