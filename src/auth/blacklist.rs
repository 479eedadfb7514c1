use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr,
};
use uuid::Uuid;

use crate::auth::token_hash;
use crate::error::AuthError;
use crate::models::token_blacklist;

/// Revocation list for access tokens. Access tokens are stateless and valid
/// until their embedded expiry; a row here is the only way to kill one early.
#[derive(Clone)]
pub struct Blacklist {
    db: DatabaseConnection,
}

impl Blacklist {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `expires_at` must be the token's own expiry claim so the row can be
    /// garbage-collected once the token would have lapsed anyway. Inserting
    /// the same token twice is a no-op.
    pub async fn insert(
        &self,
        raw_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), AuthError> {
        let inserted = token_blacklist::ActiveModel {
            id: Set(Uuid::new_v4()),
            token_hash: Set(token_hash(raw_token)),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            reason: Set(reason.to_owned()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn contains(&self, raw_token: &str) -> Result<bool, AuthError> {
        let found = token_blacklist::Entity::find()
            .filter(token_blacklist::Column::TokenHash.eq(token_hash(raw_token)))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = token_blacklist::Entity::delete_many()
            .filter(token_blacklist::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
