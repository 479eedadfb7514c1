use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::migrations::Migrator;

/// Connects to the database and brings the schema up to date.
///
/// In-memory SQLite is pinned to a single connection: each pooled connection
/// would otherwise see its own empty database.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .sqlx_logging(false)
        .connect_timeout(Duration::from_secs(10));
    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("database connected and migrated");
    Ok(db)
}
