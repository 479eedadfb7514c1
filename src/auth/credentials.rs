use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::user;

/// Read/write access to user rows. The two invariants enforced here: emails
/// are lower-cased on every path, and password hashing happens on write
/// inside this adapter, never via entity hooks.
#[derive(Clone)]
pub struct CredentialStore {
    db: DatabaseConnection,
}

impl CredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::PasswordHash(err.to_string()))
    }

    /// A malformed stored hash counts as a mismatch rather than an error; the
    /// caller already answers "invalid credentials" either way.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AuthError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(Self::normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, AuthError> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<user::Model>, AuthError> {
        user::Entity::find()
            .filter(user::Column::EmailVerificationToken.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<user::Model>, AuthError> {
        user::Entity::find()
            .filter(user::Column::PasswordResetToken.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Inserts a new user. A lost unique-constraint race on the email column
    /// surfaces as `Conflict`, same as the pre-insert duplicate check.
    pub async fn create(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        verification_token_hash: &str,
        verification_expires: DateTime<Utc>,
    ) -> Result<user::Model, AuthError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(Self::normalize_email(email)),
            password_hash: Set(Self::hash_password(password)?),
            first_name: Set(first_name.to_owned()),
            last_name: Set(last_name.to_owned()),
            is_active: Set(true),
            is_email_verified: Set(false),
            email_verification_token: Set(Some(verification_token_hash.to_owned())),
            email_verification_expires: Set(Some(verification_expires)),
            password_reset_token: Set(None),
            password_reset_expires: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|err| AuthError::or_conflict(err, "Email is already registered"))
    }

    /// Overwrites the verification pair; the prior token becomes unusable
    /// (invalidate-on-reissue).
    pub async fn set_verification_token(
        &self,
        user: user::Model,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<user::Model, AuthError> {
        let mut active = user.into_active_model();
        active.email_verification_token = Set(Some(token_hash.to_owned()));
        active.email_verification_expires = Set(Some(expires));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(Into::into)
    }

    pub async fn set_reset_token(
        &self,
        user: user::Model,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<user::Model, AuthError> {
        let mut active = user.into_active_model();
        active.password_reset_token = Set(Some(token_hash.to_owned()));
        active.password_reset_expires = Set(Some(expires));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(Into::into)
    }

    /// Sets the verified flag and clears the expiry. The token value itself
    /// is kept so a repeated click on the same emailed link answers "already
    /// verified" instead of "invalid token"; the kept value is inert.
    pub async fn mark_email_verified(&self, user: user::Model) -> Result<user::Model, AuthError> {
        let mut active = user.into_active_model();
        active.is_email_verified = Set(true);
        active.email_verification_expires = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(Into::into)
    }

    /// New password hash plus the reset pair cleared, in one update.
    pub async fn set_password(
        &self,
        user: user::Model,
        new_password: &str,
    ) -> Result<user::Model, AuthError> {
        let mut active = user.into_active_model();
        active.password_hash = Set(Self::hash_password(new_password)?);
        active.password_reset_token = Set(None);
        active.password_reset_expires = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = CredentialStore::hash_password("hunter2secret").unwrap();
        assert!(CredentialStore::verify_password("hunter2secret", &hash));
        assert!(!CredentialStore::verify_password("wrong", &hash));
        assert!(!CredentialStore::verify_password("hunter2secret", "not-a-hash"));
    }

    #[test]
    fn emails_are_case_normalized() {
        assert_eq!(
            CredentialStore::normalize_email("  Alice@Example.COM "),
            "alice@example.com"
        );
    }
}
