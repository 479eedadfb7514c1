//! Multi-device session management: list active logins, revoke one, revoke
//! all others, or log out everywhere. Revoking a session also revokes its
//! linked refresh token, so a "signed out" device cannot quietly refresh.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::AuthError;
use crate::extractors::CurrentUser;
use crate::models::session;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeSessionRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RevokeOthersRequest {
    pub current_session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub device_name: String,
    pub device_type: String,
    pub ip_address: String,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<session::Model> for SessionDto {
    fn from(session: session::Model) -> Self {
        Self {
            id: session.id,
            device_name: session.device_name,
            device_type: session.device_type,
            ip_address: session.ip_address,
            last_activity_at: session.last_activity_at,
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokedCountDto {
    pub revoked: u64,
}

#[utoipa::path(
    get,
    path = "/auth/sessions",
    tag = "sessions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Active sessions, most recent first")),
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<SessionDto>>, AuthError> {
    let sessions = state.sessions.list_active(user.id).await?;
    Ok(ApiResponse::ok(
        "Active sessions",
        sessions.into_iter().map(Into::into).collect(),
    ))
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/revoke",
    tag = "sessions",
    security(("bearer_auth" = [])),
    request_body = RevokeSessionRequest,
    responses(
        (status = 200, description = "Session and linked refresh token revoked"),
        (status = 400, description = "Session not found or already revoked"),
    ),
)]
pub async fn revoke_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RevokeSessionRequest>,
) -> Result<ApiResponse<()>, AuthError> {
    let refresh_hash = state
        .sessions
        .revoke(payload.session_id, user.id)
        .await?
        .ok_or(AuthError::SessionNotFound)?;
    state.ledger.claim(&refresh_hash).await?;
    tracing::info!(user_id = %user.id, session_id = %payload.session_id, "session revoked");
    Ok(ApiResponse::message("Session revoked"))
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/revoke-others",
    tag = "sessions",
    security(("bearer_auth" = [])),
    request_body = RevokeOthersRequest,
    responses((status = 200, description = "Count of revoked sessions")),
)]
pub async fn revoke_other_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RevokeOthersRequest>,
) -> Result<ApiResponse<RevokedCountDto>, AuthError> {
    let hashes = state
        .sessions
        .revoke_others(user.id, payload.current_session_id)
        .await?;
    for hash in &hashes {
        state.ledger.claim(hash).await?;
    }
    tracing::info!(user_id = %user.id, revoked = hashes.len(), "other sessions revoked");
    Ok(ApiResponse::ok(
        "Other sessions revoked",
        RevokedCountDto {
            revoked: hashes.len() as u64,
        },
    ))
}

#[utoipa::path(
    delete,
    path = "/auth/sessions/logout-all",
    tag = "sessions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Count of revoked sessions")),
)]
pub async fn logout_all_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<RevokedCountDto>, AuthError> {
    let hashes = state.sessions.revoke_all(user.id).await?;
    for hash in &hashes {
        state.ledger.claim(hash).await?;
    }
    tracing::info!(user_id = %user.id, revoked = hashes.len(), "all sessions revoked");
    Ok(ApiResponse::ok(
        "All sessions revoked",
        RevokedCountDto {
            revoked: hashes.len() as u64,
        },
    ))
}
