//! Auth orchestrator endpoints: the state-machine driver for registration,
//! login, token rotation and the email-verification / password-reset flows.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::auth::{self, CredentialStore};
use crate::controllers::client_meta;
use crate::error::AuthError;
use crate::extractors::CurrentUser;
use crate::mail;
use crate::models::user;
use crate::response::ApiResponse;

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// User payload without secret fields; the password hash and token columns
/// never leave the service.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserDto {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; verification email queued"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed"),
    ),
)]
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<AuthPayload>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let email = CredentialStore::normalize_email(&payload.email);
    if state.credentials.find_by_email(&email).await?.is_some() {
        return Err(AuthError::Conflict("Email is already registered"));
    }

    let verification_token = auth::generate_token();
    let verification_expires = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
    let user = state
        .credentials
        .create(
            &email,
            &payload.first_name,
            &payload.last_name,
            &payload.password,
            &auth::token_hash(&verification_token),
            verification_expires,
        )
        .await?;

    let (ip, user_agent) = client_meta(&headers, peer);
    let tokens = auth::issue_session(&state, &user, &ip, &user_agent).await?;

    send_verification_email(&state, &user, &verification_token).await;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(ApiResponse::created(
        "Registration successful",
        AuthPayload {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
    )
    .with_meta(json!({ "email_verification_required": true })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated"),
        (status = 401, description = "Invalid credentials or deactivated account"),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<AuthPayload>, AuthError> {
    // Unknown email and wrong password take the same early exit so the two
    // are indistinguishable to the caller.
    let user = state
        .credentials
        .find_by_email(&payload.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !CredentialStore::verify_password(&payload.password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }

    let (ip, user_agent) = client_meta(&headers, peer);
    let tokens = auth::issue_session(&state, &user, &ip, &user_agent).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    let verification_required = !user.is_email_verified;
    Ok(ApiResponse::ok(
        "Login successful",
        AuthPayload {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
    )
    .with_meta(json!({ "email_verification_required": verification_required })))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Logged out everywhere")),
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<()>, AuthError> {
    // The presented access token is blacklisted with its own expiry; refresh
    // tokens and sessions are revoked account-wide.
    let claims = state.codec.verify(&user.token)?;
    let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
    state
        .blacklist
        .insert(&user.token, user.id, expires_at, "logout")
        .await?;

    let revoked = state.ledger.revoke_all_for_user(user.id).await?;
    state.sessions.revoke_all(user.id).await?;
    tracing::info!(user_id = %user.id, revoked_refresh_tokens = revoked, "user logged out");

    Ok(ApiResponse::message("Logged out successfully"))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued"),
        (status = 401, description = "Invalid, expired or revoked refresh token"),
    ),
)]
pub async fn refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<ApiResponse<TokenPairDto>, AuthError> {
    let row = state
        .ledger
        .find(&payload.refresh_token)
        .await?
        .ok_or(AuthError::TokenInvalid)?;
    if row.is_revoked {
        return Err(AuthError::TokenRevoked);
    }
    if row.expires_at < Utc::now() {
        return Err(AuthError::TokenExpired);
    }

    // Single-use rotation: the old row is claimed atomically before the new
    // pair exists. Zero rows affected means a concurrent refresh got here
    // first; that replay loses, even on its very first attempt.
    if !state.ledger.claim(&row.token_hash).await? {
        tracing::warn!(user_id = %row.user_id, "refresh token replay detected");
        return Err(AuthError::TokenRevoked);
    }
    state
        .sessions
        .deactivate_by_refresh_hash(&row.token_hash)
        .await?;

    let user = state
        .credentials
        .find_by_id(row.user_id)
        .await?
        .ok_or(AuthError::TokenInvalid)?;
    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }

    let (ip, user_agent) = client_meta(&headers, peer);
    let tokens = auth::issue_session(&state, &user, &ip, &user_agent).await?;

    Ok(ApiResponse::ok(
        "Token refreshed",
        TokenPairDto {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Uniform response whether or not the account exists"),
        (status = 500, description = "Reset email could not be sent"),
    ),
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, AuthError> {
    if let Some(user) = state.credentials.find_by_email(&payload.email).await? {
        let reset_token = auth::generate_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        let user = state
            .credentials
            .set_reset_token(user, &auth::token_hash(&reset_token), expires)
            .await?;

        // Here the email is the deliverable, so a dispatch failure is the one
        // mail error that surfaces to the client.
        let (subject, body) = mail::password_reset_email(&user.first_name, &reset_token);
        state
            .mailer
            .send(&user.email, &subject, &body)
            .await
            .map_err(|err| AuthError::Mail(err.to_string()))?;
        tracing::info!(user_id = %user.id, "password reset email sent");
    }

    Ok(ApiResponse::message(
        "If an account with that email exists, a password reset link has been sent",
    ))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset; all refresh tokens revoked"),
        (status = 400, description = "Invalid or expired reset token"),
    ),
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, AuthError> {
    payload
        .validate()
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let user = state
        .credentials
        .find_by_reset_token(&auth::token_hash(&payload.token))
        .await?
        .ok_or(AuthError::InvalidOrExpired("Invalid or expired reset token"))?;
    let lapsed = user
        .password_reset_expires
        .is_none_or(|expires| expires < Utc::now());
    if lapsed {
        return Err(AuthError::InvalidOrExpired("Invalid or expired reset token"));
    }

    let user = state
        .credentials
        .set_password(user, &payload.new_password)
        .await?;

    // Force re-login everywhere.
    let revoked = state.ledger.revoke_all_for_user(user.id).await?;
    state.sessions.revoke_all(user.id).await?;
    tracing::info!(user_id = %user.id, revoked_refresh_tokens = revoked, "password reset");

    Ok(ApiResponse::message("Password reset successful"))
}

#[utoipa::path(
    post,
    path = "/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified (idempotent)"),
        (status = 400, description = "Invalid or expired verification token"),
    ),
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<ApiResponse<()>, AuthError> {
    let user = state
        .credentials
        .find_by_verification_token(&auth::token_hash(&payload.token))
        .await?
        .ok_or(AuthError::InvalidOrExpired(
            "Invalid or expired verification token",
        ))?;

    // Idempotent short-circuit before the expiry check: re-clicking the same
    // link after success must answer 200, never "expired".
    if user.is_email_verified {
        return Ok(ApiResponse::message("Email is already verified"));
    }
    let lapsed = user
        .email_verification_expires
        .is_none_or(|expires| expires < Utc::now());
    if lapsed {
        return Err(AuthError::InvalidOrExpired("Verification token has expired"));
    }

    let user = state.credentials.mark_email_verified(user).await?;
    tracing::info!(user_id = %user.id, "email verified");
    Ok(ApiResponse::message("Email verified successfully"))
}

#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fresh verification email queued"),
        (status = 400, description = "Email already verified"),
        (status = 404, description = "User no longer exists"),
    ),
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<ApiResponse<()>, AuthError> {
    let user = state
        .credentials
        .find_by_id(current.id)
        .await?
        .ok_or(AuthError::NotFound("User not found"))?;
    if user.is_email_verified {
        return Err(AuthError::AlreadyVerified);
    }

    let verification_token = auth::generate_token();
    let expires = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
    let user = state
        .credentials
        .set_verification_token(user, &auth::token_hash(&verification_token), expires)
        .await?;

    send_verification_email(&state, &user, &verification_token).await;
    Ok(ApiResponse::message("Verification email sent"))
}

/// Best effort: a failed verification email never fails the surrounding
/// operation.
async fn send_verification_email(state: &AppState, user: &user::Model, token: &str) {
    let (subject, body) = mail::verification_email(&user.first_name, token);
    if let Err(err) = state.mailer.send(&user.email, &subject, &body).await {
        tracing::warn!(user_id = %user.id, error = %err, "verification email failed");
    }
}
