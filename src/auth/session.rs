use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::auth::device::DeviceInfo;
use crate::error::AuthError;
use crate::models::session;

/// One row per login. Registry operations only flip session rows; they hand
/// the linked refresh-token hashes back to the caller, which owns revoking
/// the ledger side. That keeps the session/ledger linkage closed without this
/// type writing to another component's table.
#[derive(Clone)]
pub struct SessionRegistry {
    db: DatabaseConnection,
}

impl SessionRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        refresh_token_hash: &str,
        device: &DeviceInfo,
        ip_address: &str,
        user_agent: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<session::Model, AuthError> {
        let now = Utc::now();
        session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            refresh_token_hash: Set(refresh_token_hash.to_owned()),
            device_name: Set(device.device_name.clone()),
            device_type: Set(device.device_type.to_owned()),
            ip_address: Set(ip_address.to_owned()),
            user_agent: Set(user_agent.to_owned()),
            last_activity_at: Set(now),
            is_active: Set(true),
            expires_at: Set(expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(Into::into)
    }

    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<session::Model>, AuthError> {
        session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true))
            .order_by_desc(session::Column::LastActivityAt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Deactivates one session owned by `user_id`. Returns the linked refresh
    /// token hash, or `None` when the session is missing, foreign, or already
    /// revoked.
    pub async fn revoke(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<String>, AuthError> {
        let found = session::Entity::find_by_id(session_id)
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;
        let Some(session) = found else {
            return Ok(None);
        };
        self.deactivate_ids(&[session.id]).await?;
        Ok(Some(session.refresh_token_hash))
    }

    /// Deactivates every active session except `keep`, returning the linked
    /// refresh token hashes.
    pub async fn revoke_others(
        &self,
        user_id: Uuid,
        keep: Option<Uuid>,
    ) -> Result<Vec<String>, AuthError> {
        let mut query = session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true));
        if let Some(keep) = keep {
            query = query.filter(session::Column::Id.ne(keep));
        }
        let sessions = query.all(&self.db).await?;
        self.deactivate_models(&sessions).await
    }

    pub async fn revoke_all(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        let sessions = session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;
        self.deactivate_models(&sessions).await
    }

    /// Marks the session created with a (now consumed) refresh token
    /// inactive. Used on rotation so the replaced login disappears from the
    /// session list.
    pub async fn deactivate_by_refresh_hash(&self, refresh_token_hash: &str) -> Result<(), AuthError> {
        session::Entity::update_many()
            .col_expr(session::Column::IsActive, Expr::value(false))
            .col_expr(session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(session::Column::RefreshTokenHash.eq(refresh_token_hash))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Physical deletion: sessions inactive for longer than the retention
    /// window, plus anything past its own expiry.
    pub async fn delete_stale(
        &self,
        now: DateTime<Utc>,
        retention_days: i64,
    ) -> Result<u64, AuthError> {
        let cutoff = now - Duration::days(retention_days);
        let result = session::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(session::Column::IsActive.eq(false))
                            .add(session::Column::UpdatedAt.lt(cutoff)),
                    )
                    .add(session::Column::ExpiresAt.lt(now)),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn deactivate_models(&self, sessions: &[session::Model]) -> Result<Vec<String>, AuthError> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        self.deactivate_ids(&ids).await?;
        Ok(sessions
            .iter()
            .map(|s| s.refresh_token_hash.clone())
            .collect())
    }

    async fn deactivate_ids(&self, ids: &[Uuid]) -> Result<(), AuthError> {
        session::Entity::update_many()
            .col_expr(session::Column::IsActive, Expr::value(false))
            .col_expr(session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(session::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
