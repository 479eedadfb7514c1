use sea_orm_migration::{prelude::*, schema::*};

use super::m20260801_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TokenBlacklist::Table)
                    .if_not_exists()
                    .col(pk_uuid(TokenBlacklist::Id))
                    .col(string_uniq(TokenBlacklist::TokenHash))
                    .col(uuid(TokenBlacklist::UserId))
                    .col(timestamp_with_time_zone(TokenBlacklist::ExpiresAt))
                    .col(string(TokenBlacklist::Reason))
                    .col(timestamp_with_time_zone(TokenBlacklist::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_token_blacklist_user_id")
                            .from(TokenBlacklist::Table, TokenBlacklist::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_token_blacklist_expires_at")
                    .table(TokenBlacklist::Table)
                    .col(TokenBlacklist::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenBlacklist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TokenBlacklist {
    Table,
    Id,
    TokenHash,
    UserId,
    ExpiresAt,
    Reason,
    CreatedAt,
}
