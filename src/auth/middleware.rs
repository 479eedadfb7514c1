use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::AuthError;

/// Identity attached to the request once the bearer gate passes. `token` is
/// the raw access token; logout needs it to blacklist the exact string.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Per-request bearer gate: decode the token, consult the revocation list,
/// confirm the user still exists and is active, then attach the identity.
/// Every request re-queries the blacklist; there is no cross-request cache.
///
/// Internal failure kinds are logged distinctly but the client sees one
/// generic 401 per category.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::Unauthorized("Missing bearer token"))?
        .to_owned();

    let claims = state.codec.verify(&token).map_err(|err| {
        tracing::warn!(code = err.code(), "bearer token rejected");
        AuthError::Unauthorized("Invalid or expired token")
    })?;

    if state.blacklist.contains(&token).await? {
        tracing::warn!(user_id = %claims.sub, "revoked access token presented");
        return Err(AuthError::Unauthorized("Token has been revoked"));
    }

    let user = state
        .credentials
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized("User not found"))?;
    if !user.is_active {
        return Err(AuthError::Unauthorized("Account is deactivated"));
    }

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        token,
    });
    Ok(next.run(req).await)
}
