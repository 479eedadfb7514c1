//! Cleanup sweeps driven one-shot, the way the in-process scheduler (or an
//! external timer) would run them.

use chrono::{Duration, Utc};
use doorman::TestApp;
use doorman::cleanup::CleanupScheduler;
use doorman::models::{refresh_token, session, token_blacklist};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

fn scheduler(app: &TestApp) -> CleanupScheduler {
    CleanupScheduler::new(
        app.state.ledger.clone(),
        app.state.blacklist.clone(),
        app.state.sessions.clone(),
        app.state.config.clone(),
    )
}

#[tokio::test]
async fn expired_token_sweep_deletes_ledger_and_blacklist_rows() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("alice@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");

    // Logout seeds a blacklist row; the register seeded a ledger row.
    client.post_auth("/auth/logout", &access).await;
    assert_eq!(refresh_token::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(token_blacklist::Entity::find().count(&app.db).await.unwrap(), 1);

    // Nothing has expired yet: the sweep is a no-op.
    assert_eq!(scheduler(&app).sweep_expired_tokens().await.unwrap(), 0);

    // Backdate everything past expiry; revoked state is irrelevant to GC.
    let past = Utc::now() - Duration::hours(1);
    refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::ExpiresAt, Expr::value(past))
        .exec(&app.db)
        .await
        .unwrap();
    token_blacklist::Entity::update_many()
        .col_expr(token_blacklist::Column::ExpiresAt, Expr::value(past))
        .exec(&app.db)
        .await
        .unwrap();

    assert_eq!(scheduler(&app).sweep_expired_tokens().await.unwrap(), 2);
    assert_eq!(refresh_token::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(token_blacklist::Entity::find().count(&app.db).await.unwrap(), 0);

    // Idempotent: a second pass finds nothing.
    assert_eq!(scheduler(&app).sweep_expired_tokens().await.unwrap(), 0);
}

#[tokio::test]
async fn stale_session_sweep_honors_retention_and_expiry() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("bob@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");
    client.login("bob@example.com", "password123").await;
    client.login("bob@example.com", "password123").await;

    // Deactivate one session, then age it past the 30-day retention window.
    let sessions = client.get_auth("/auth/sessions", &access).await;
    let victim = sessions.str_at("/data/2/id");
    client
        .delete_auth("/auth/sessions/revoke", &access, json!({ "sessionId": victim }))
        .await;

    // Recently deactivated: retained.
    assert_eq!(scheduler(&app).sweep_stale_sessions().await.unwrap(), 0);

    session::Entity::update_many()
        .col_expr(
            session::Column::UpdatedAt,
            Expr::value(Utc::now() - Duration::days(31)),
        )
        .filter(session::Column::IsActive.eq(false))
        .exec(&app.db)
        .await
        .unwrap();
    assert_eq!(scheduler(&app).sweep_stale_sessions().await.unwrap(), 1);

    // An active session past its own expiry is swept too.
    session::Entity::update_many()
        .col_expr(
            session::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::minutes(1)),
        )
        .exec(&app.db)
        .await
        .unwrap();
    assert_eq!(scheduler(&app).sweep_stale_sessions().await.unwrap(), 2);
    assert_eq!(session::Entity::find().count(&app.db).await.unwrap(), 0);
}
