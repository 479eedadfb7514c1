use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::response::ApiResponse;

/// Central error type for the auth subsystem.
///
/// Each variant maps to one HTTP status via [`AuthError::status`]. Kinds that
/// share a status (the three token failures, for instance) stay distinct here
/// so they can be logged apart even when the client sees a generic message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; one message for both so the response
    /// cannot be used to enumerate accounts.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("Account is deactivated")]
    AccountDisabled,

    /// Unique-constraint conflicts, e.g. duplicate email registration.
    #[error("{0}")]
    Conflict(&'static str),

    /// A signed token past its embedded expiry.
    #[error("Token has expired")]
    TokenExpired,

    /// Signature or format failure; treated as a tampering signal in the logs.
    #[error("Invalid token")]
    TokenInvalid,

    /// A refresh token that was already rotated, or an access token on the
    /// revocation list.
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Verification / reset token failures, surfaced as 400 with a
    /// flow-specific message.
    #[error("{0}")]
    InvalidOrExpired(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Session not found or already revoked")]
    SessionNotFound,

    /// Bearer-gate rejections from the validation middleware.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Request payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// Mail dispatch failed on a path where the email is the deliverable.
    #[error("failed to send email: {0}")]
    Mail(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("{0}")]
    Internal(&'static str),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::TokenRevoked
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidOrExpired(_) | Self::AlreadyVerified | Self::SessionNotFound => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Mail(_) | Self::PasswordHash(_) | Self::Internal(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine code used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::Conflict(_) => "CONFLICT",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::InvalidOrExpired(_) => "INVALID_OR_EXPIRED_TOKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyVerified => "ALREADY_VERIFIED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Mail(_) => "MAIL_FAILED",
            Self::PasswordHash(_) => "PASSWORD_HASH_FAILED",
            Self::Internal(_) => "INTERNAL",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Message sent to the client. 5xx variants never leak internals.
    fn client_message(&self) -> String {
        match self {
            Self::Mail(_) => "Failed to send email".to_owned(),
            Self::PasswordHash(_) | Self::Internal(_) | Self::Database(_) => {
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        }
    }

    /// Maps a store-level unique-constraint violation to `Conflict`, keeping
    /// everything else as a database error. Covers the race where two
    /// concurrent registrations both pass the duplicate check.
    pub fn or_conflict(err: DbErr, conflict: &'static str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(conflict),
            _ => Self::Database(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        ApiResponse::<()>::error(status, self.client_message()).into_response()
    }
}
