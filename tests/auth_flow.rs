//! Register / login / logout / refresh lifecycle, end to end over HTTP.

use doorman::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_returns_tokens_and_no_secret_fields() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let res = client.register("alice@example.com", "password123").await;
    assert_eq!(res.status, 201);
    assert_eq!(res.at("/status"), "success");
    assert_eq!(res.at("/statusCode"), 201);
    assert_eq!(res.at("/path"), "/auth/register");
    assert_eq!(res.at("/data/user/email"), "alice@example.com");
    assert!(res.at("/data/user/password").is_null());
    assert!(res.at("/data/user/passwordHash").is_null());
    assert_eq!(res.at("/meta/email_verification_required"), true);

    let access = res.str_at("/data/accessToken");
    let refresh = res.str_at("/data/refreshToken");
    assert!(!access.is_empty());
    assert!(!refresh.is_empty());
    assert_ne!(access, refresh);

    // The verification email went out, best effort.
    let mail = app.mailer.last().expect("verification email");
    assert_eq!(mail.to, "alice@example.com");
}

#[tokio::test]
async fn register_normalizes_email_case_and_rejects_duplicates() {
    let app = TestApp::spawn().await;
    let client = app.client();

    assert_eq!(client.register("Bob@Example.COM", "password123").await.status, 201);

    let dup = client.register("bob@example.com", "password123").await;
    assert_eq!(dup.status, 409);
    assert_eq!(dup.message(), "Email is already registered");

    // Login works with any casing because comparison is normalized.
    let res = client.login("BOB@example.com", "password123").await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn register_validates_payload() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let res = client
        .post(
            "/auth/register",
            json!({
                "email": "not-an-email",
                "firstName": "A",
                "lastName": "B",
                "password": "password123",
            }),
        )
        .await;
    assert_eq!(res.status, 422);

    let res = client.register("short@example.com", "short").await;
    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn login_token_passes_bearer_validation_for_same_subject() {
    let app = TestApp::spawn().await;
    let client = app.client();
    client.register("carol@example.com", "password123").await;

    let res = client.login("carol@example.com", "password123").await;
    assert_eq!(res.status, 200);
    let access = res.str_at("/data/accessToken");
    let user_id = res.str_at("/data/user/id");

    // The token decodes back to the same subject...
    let claims = app.state.codec.verify(&access).expect("valid access token");
    assert_eq!(claims.sub.to_string(), user_id);

    // ...and the bearer gate accepts it.
    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = TestApp::spawn().await;
    let client = app.client();
    client.register("dave@example.com", "password123").await;

    let wrong_password = client.login("dave@example.com", "wrong-password").await;
    let unknown_email = client.login("nobody@example.com", "password123").await;

    assert_eq!(wrong_password.status, 401);
    assert_eq!(unknown_email.status, 401);
    assert_eq!(wrong_password.message(), "Invalid email or password");
    assert_eq!(wrong_password.message(), unknown_email.message());
}

#[tokio::test]
async fn deactivated_account_cannot_login_or_use_tokens() {
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("eve@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");

    doorman::models::user::Entity::update_many()
        .col_expr(doorman::models::user::Column::IsActive, Expr::value(false))
        .filter(doorman::models::user::Column::Email.eq("eve@example.com"))
        .exec(&app.db)
        .await
        .unwrap();

    let res = client.login("eve@example.com", "password123").await;
    assert_eq!(res.status, 401);
    assert_eq!(res.message(), "Account is deactivated");

    // The still-unexpired access token is rejected by the bearer gate too.
    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn deleted_user_token_is_rejected_by_bearer_gate() {
    use sea_orm::EntityTrait;

    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("ghost@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");
    let user_id = uuid::Uuid::parse_str(&res.str_at("/data/user/id")).unwrap();

    doorman::models::user::Entity::delete_by_id(user_id)
        .exec(&app.db)
        .await
        .unwrap();

    // The token still verifies, but its subject no longer exists.
    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn refresh_burns_token_when_owner_is_deactivated() {
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("henry@example.com", "password123").await;
    let refresh = res.str_at("/data/refreshToken");

    doorman::models::user::Entity::update_many()
        .col_expr(doorman::models::user::Column::IsActive, Expr::value(false))
        .filter(doorman::models::user::Column::Email.eq("henry@example.com"))
        .exec(&app.db)
        .await
        .unwrap();

    let res = client.post("/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.message(), "Account is deactivated");

    // Fail closed: the token was claimed before the owner check, so the same
    // token is spent even though no replacement pair was issued.
    let replay = client.post("/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(replay.status, 401);
    assert_eq!(replay.message(), "Token has been revoked");
}

#[tokio::test]
async fn logout_blacklists_access_token_and_revokes_refresh_tokens() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("frank@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");
    let refresh = res.str_at("/data/refreshToken");

    let res = client.post_auth("/auth/logout", &access).await;
    assert_eq!(res.status, 200);

    // The access token's own expiry has not elapsed, yet it is now rejected.
    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 401);

    // Logout is account-wide for refresh tokens.
    let res = client.post("/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.message(), "Token has been revoked");
}

#[tokio::test]
async fn refresh_rotates_and_old_token_is_single_use() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("grace@example.com", "password123").await;
    let old_refresh = res.str_at("/data/refreshToken");

    let res = client
        .post("/auth/refresh", json!({ "refreshToken": old_refresh }))
        .await;
    assert_eq!(res.status, 200);
    let new_refresh = res.str_at("/data/refreshToken");
    assert!(!new_refresh.is_empty());
    assert_ne!(new_refresh, old_refresh);

    // Presenting the consumed token again fails as revoked.
    let replay = client
        .post("/auth/refresh", json!({ "refreshToken": old_refresh }))
        .await;
    assert_eq!(replay.status, 401);
    assert_eq!(replay.message(), "Token has been revoked");

    // The rotated-in token still works.
    let res = client
        .post("/auth/refresh", json!({ "refreshToken": new_refresh }))
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn refresh_rejects_unknown_and_expired_tokens() {
    use chrono::{Duration, Utc};
    use sea_orm::sea_query::Expr;
    use sea_orm::EntityTrait;

    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("heidi@example.com", "password123").await;
    let refresh = res.str_at("/data/refreshToken");

    let unknown = client
        .post("/auth/refresh", json!({ "refreshToken": "deadbeef" }))
        .await;
    assert_eq!(unknown.status, 401);
    assert_eq!(unknown.message(), "Invalid token");

    // Backdate the ledger row past expiry.
    doorman::models::refresh_token::Entity::update_many()
        .col_expr(
            doorman::models::refresh_token::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::hours(1)),
        )
        .exec(&app.db)
        .await
        .unwrap();

    let expired = client
        .post("/auth/refresh", json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(expired.status, 401);
    assert_eq!(expired.message(), "Token has expired");
}

#[tokio::test]
async fn protected_routes_reject_missing_and_garbage_tokens() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let res = client.get_auth("/auth/sessions", "garbage.token.here").await;
    assert_eq!(res.status, 401);

    let res = client
        .post("/auth/logout", json!({}))
        .await;
    assert_eq!(res.status, 401);
}
