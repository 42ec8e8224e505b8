//! Security audit logging for authentication events
//!
//! Every security-relevant event (login, logout, refresh, registration,
//! password change, denied access, bad tokens) is logged at INFO with the
//! "audit" target so operators can route the audit stream separately from
//! application logs. Events serialize to JSON for log aggregators.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use skillswap_core::UserRole;
use tracing::info;
use uuid::Uuid;

/// Request metadata attached to audit events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    /// Build a context from request headers.
    ///
    /// IP comes from `X-Forwarded-For` (first hop) or `X-Real-IP`; absent
    /// both, it stays unknown rather than guessing from connection info.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string())
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: UserRole,
    },
    RegistrationFailure {
        email: String,
        reason: String,
    },
    LoginSuccess {
        user_id: Uuid,
        email: String,
    },
    LoginFailure {
        email: String,
        reason: String,
    },
    TokenRefresh {
        user_id: Uuid,
    },
    Logout {
        user_id: Uuid,
        email: String,
        everywhere: bool,
    },
    PasswordChange {
        user_id: Uuid,
        email: String,
    },
    AccessDenied {
        user_id: Uuid,
        email: String,
        required_roles: String,
    },
    InvalidToken {
        reason: String,
    },
}

/// Emit an audit event with structured fields
pub fn audit_log(ctx: &AuditContext, event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess { user_id, email, role } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                role = %role,
                ip_address = ?ctx.ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure { email, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ctx.ip_address,
                "Registration failed"
            );
        }
        AuditEvent::LoginSuccess { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ctx.ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure { email, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ctx.ip_address,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh { user_id } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ctx.ip_address,
                "Token refresh"
            );
        }
        AuditEvent::Logout {
            user_id,
            email,
            everywhere,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                everywhere = %everywhere,
                ip_address = ?ctx.ip_address,
                "User logout"
            );
        }
        AuditEvent::PasswordChange { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ctx.ip_address,
                "Password changed"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            required_roles,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                required_roles = %required_roles,
                ip_address = ?ctx.ip_address,
                "Access denied"
            );
        }
        AuditEvent::InvalidToken { reason } => {
            info!(
                target: "audit",
                event = %event_json,
                reason = %reason,
                ip_address = ?ctx.ip_address,
                user_agent = ?ctx.user_agent,
                "Invalid token"
            );
        }
    }
}
