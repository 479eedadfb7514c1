use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::auth::{generate_token, token_hash};
use crate::error::AuthError;
use crate::models::refresh_token;

/// A freshly issued refresh token: the raw value goes to the client, the hash
/// is what the ledger and session rows store.
pub struct IssuedRefreshToken {
    pub token: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Persistence for issued refresh tokens, one row per issuance.
#[derive(Clone)]
pub struct RefreshTokenLedger {
    db: DatabaseConnection,
}

impl RefreshTokenLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn issue(
        &self,
        user_id: Uuid,
        ip_address: &str,
        user_agent: &str,
        ttl: Duration,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let token = generate_token();
        let hash = token_hash(&token);
        let now = Utc::now();
        let expires_at = now + ttl;

        refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(hash.clone()),
            expires_at: Set(expires_at),
            is_revoked: Set(false),
            ip_address: Set(ip_address.to_owned()),
            user_agent: Set(user_agent.to_owned()),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(IssuedRefreshToken {
            token,
            hash,
            expires_at,
        })
    }

    /// Looks up the ledger row for a presented raw token.
    pub async fn find(&self, raw_token: &str) -> Result<Option<refresh_token::Model>, AuthError> {
        refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash(raw_token)))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Atomically claims a live token row: one conditional UPDATE, no
    /// read-then-write window. `false` means the row was already revoked --
    /// including when a concurrent refresh presenting the same token won the
    /// race.
    pub async fn claim(&self, hash: &str) -> Result<bool, AuthError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::IsRevoked, Expr::value(true))
            .filter(refresh_token::Column::TokenHash.eq(hash))
            .filter(refresh_token::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Revokes every live token for a user (logout, password reset). Returns
    /// the number of rows flipped.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::IsRevoked, Expr::value(true))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Drops rows past expiry, revoked or not.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = refresh_token::Entity::delete_many()
            .filter(refresh_token::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
