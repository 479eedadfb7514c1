//! Authentication & session lifecycle components: token codec, credential
//! store, refresh token ledger, revocation list, session registry and the
//! bearer validation middleware. The HTTP controllers orchestrate these.

pub mod blacklist;
pub mod credentials;
pub mod device;
pub mod jwt;
pub mod middleware;
pub mod refresh;
pub mod session;

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use blacklist::Blacklist;
pub use credentials::CredentialStore;
pub use jwt::JwtCodec;
pub use middleware::{AuthUser, require_auth};
pub use refresh::RefreshTokenLedger;
pub use session::SessionRegistry;

use crate::app::AppState;
use crate::error::AuthError;
use crate::models::user;

/// 32 random bytes, hex encoded. Used for refresh, verification and reset
/// tokens alike.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Long-lived tokens are stored as SHA-256 hex digests, never raw; a store
/// compromise must not be a token compromise.
pub fn token_hash(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Access/refresh pair plus the session created alongside. Shared issuance
/// path for register, login and refresh.
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: Uuid,
}

pub async fn issue_session(
    state: &AppState,
    user: &user::Model,
    ip_address: &str,
    user_agent: &str,
) -> Result<IssuedTokens, AuthError> {
    let access_token = state.codec.issue_access(user.id, &user.email)?;
    let issued = state
        .ledger
        .issue(user.id, ip_address, user_agent, state.config.refresh_ttl())
        .await?;
    let device = device::parse_user_agent(user_agent);
    let session = state
        .sessions
        .create(
            user.id,
            &issued.hash,
            &device,
            ip_address,
            user_agent,
            issued.expires_at,
        )
        .await?;

    tracing::debug!(user_id = %user.id, session_id = %session.id, "session issued");
    Ok(IssuedTokens {
        access_token,
        refresh_token: issued.token,
        session_id: session.id,
    })
}
