//! Request authentication and role authorization
//!
//! `auth_middleware` is the gate every protected route goes through: bearer
//! extraction, token verification, revocation check, then the authenticated
//! identity is attached to request extensions. `require_role` layers a role
//! check on top. Neither gate mutates the store or the registry.

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::token::{TokenError, TokenKind};
use crate::error::AuthError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use skillswap_core::UserRole;
use std::sync::Arc;
use uuid::Uuid;

/// Identity attached to the request after successful authentication.
///
/// Extract in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    /// The raw access token, kept so logout can revoke it
    pub token: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn map_access_token_error(e: TokenError) -> AuthError {
    match e {
        TokenError::Expired => AuthError::TokenExpired,
        TokenError::WrongKind { .. } => AuthError::WrongTokenKind,
        TokenError::InvalidSignature
        | TokenError::Invalid
        | TokenError::Malformed
        | TokenError::Encoding(_) => AuthError::TokenInvalid,
    }
}

/// Authentication middleware requiring a valid, unrevoked access token
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let ctx = AuditContext::from_headers(request.headers());

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::TokenMissing)?
        .to_str()
        .map_err(|_| AuthError::TokenMalformed)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::TokenMalformed)?;

    let claims = state
        .codec
        .verify(token, TokenKind::Access)
        .map_err(|e| {
            audit_log(
                &ctx,
                &AuditEvent::InvalidToken {
                    reason: e.to_string(),
                },
            );
            map_access_token_error(e)
        })?;

    // Signature-valid but explicitly revoked (logout, password change)
    if state.registry.is_revoked(token) {
        audit_log(
            &ctx,
            &AuditEvent::InvalidToken {
                reason: "token revoked".to_string(),
            },
        );
        return Err(AuthError::TokenRevoked);
    }

    let user = AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        token: token.to_string(),
    };
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role-based access control.
///
/// Layer after `auth_middleware`; denies with `InsufficientPermissions` when
/// the authenticated role is not in the allowed set, and with
/// `AuthenticationRequired` when no identity was attached at all.
pub fn require_role(
    allowed: &'static [UserRole],
) -> impl Fn(Request, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let ctx = AuditContext::from_headers(request.headers());

            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .ok_or(AuthError::AuthenticationRequired)?
                .clone();

            if !allowed.contains(&user.role) {
                audit_log(
                    &ctx,
                    &AuditEvent::AccessDenied {
                        user_id: user.id,
                        email: user.email.clone(),
                        required_roles: allowed
                            .iter()
                            .map(|r| r.as_str())
                            .collect::<Vec<_>>()
                            .join(","),
                    },
                );
                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}
