//! Admin handlers
//!
//! Operational introspection, admin role only.

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Live session counters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsResponse {
    pub success: bool,
    /// Refresh tokens that would currently be accepted
    pub active_refresh_tokens: usize,
    /// All refresh records held, including deactivated ones awaiting sweep
    pub stored_refresh_tokens: usize,
    /// Access tokens revoked before natural expiry
    pub revoked_access_tokens: usize,
    pub uptime_seconds: u64,
}

/// Session and revocation counters
#[utoipa::path(
    get,
    path = "/api/v1/admin/sessions",
    tag = "admin",
    responses(
        (status = 200, description = "Session counters", body = SessionStatsResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn session_stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(SessionStatsResponse {
        success: true,
        active_refresh_tokens: state.store.active_count(),
        stored_refresh_tokens: state.store.len(),
        revoked_access_tokens: state.registry.len(),
        uptime_seconds: state.uptime_secs(),
    })
}
