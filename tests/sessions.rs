//! Multi-device session registry over HTTP: list, revoke-one, revoke-others,
//! logout-all, and the linkage to refresh-token revocation.

use doorman::TestApp;
use serde_json::json;

#[tokio::test]
async fn each_login_creates_a_session_with_device_metadata() {
    let app = TestApp::spawn().await;
    let client = app.client();
    client.register("alice@example.com", "password123").await;
    let res = client.login("alice@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");

    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 200);
    let sessions = res.at("/data");
    let sessions = sessions.as_array().expect("session array");
    // One from register (no UA on the login test client call) plus one login.
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().any(|s| s["deviceName"] == "Chrome on Windows"));
}

#[tokio::test]
async fn unproxied_session_records_the_peer_address() {
    let app = TestApp::spawn().await;
    let client = app.client();
    // No x-forwarded-for header anywhere in this flow, so the session keeps
    // the TCP peer address instead of a placeholder.
    let res = client.register("frank@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");

    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.at("/data/0/ipAddress"), "127.0.0.1");
}

#[tokio::test]
async fn revoke_kills_the_session_and_its_refresh_token() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let registered = client.register("bob@example.com", "password123").await;
    let access = registered.str_at("/data/accessToken");

    // Second device logs into the same account.
    let phone_login = client.login("bob@example.com", "password123").await;
    let phone_refresh = phone_login.str_at("/data/refreshToken");

    let res = client.get_auth("/auth/sessions", &access).await;
    let sessions = res.at("/data");
    let sessions = sessions.as_array().expect("session array");
    assert_eq!(sessions.len(), 2);

    // Revoke the newest session (the login), keeping the register session.
    let newest = sessions[0]["id"].as_str().expect("session id").to_owned();
    let res = client
        .delete_auth("/auth/sessions/revoke", &access, json!({ "sessionId": newest }))
        .await;
    assert_eq!(res.status, 200);

    // Its linked refresh token is revoked with it.
    let res = client
        .post("/auth/refresh", json!({ "refreshToken": phone_refresh }))
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.message(), "Token has been revoked");

    // Revoking again: already revoked.
    let res = client
        .delete_auth("/auth/sessions/revoke", &access, json!({ "sessionId": newest }))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.message(), "Session not found or already revoked");
}

#[tokio::test]
async fn cannot_revoke_another_users_session() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let alice = client.register("alice@example.com", "password123").await;
    let bob = client.register("bob@example.com", "password123").await;
    let bob_access = bob.str_at("/data/accessToken");

    let res = client.get_auth("/auth/sessions", &alice.str_at("/data/accessToken")).await;
    let alice_session = res.at("/data/0/id");

    let res = client
        .delete_auth(
            "/auth/sessions/revoke",
            &bob_access,
            json!({ "sessionId": alice_session }),
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.message(), "Session not found or already revoked");
}

#[tokio::test]
async fn revoke_others_keeps_the_named_session() {
    let app = TestApp::spawn().await;
    let client = app.client();
    client.register("carol@example.com", "password123").await;
    client.login("carol@example.com", "password123").await;
    let current = client.login("carol@example.com", "password123").await;
    let access = current.str_at("/data/accessToken");
    let current_refresh = current.str_at("/data/refreshToken");

    let res = client.get_auth("/auth/sessions", &access).await;
    let sessions = res.at("/data");
    let sessions = sessions.as_array().expect("session array");
    assert_eq!(sessions.len(), 3);
    // Most recent first: index 0 is the current login.
    let current_id = sessions[0]["id"].as_str().expect("session id").to_owned();

    let res = client
        .delete_auth(
            "/auth/sessions/revoke-others",
            &access,
            json!({ "currentSessionId": current_id }),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.at("/data/revoked"), 2);

    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.at("/data").as_array().expect("session array").len(), 1);

    // The kept session's refresh token still rotates.
    let res = client
        .post("/auth/refresh", json!({ "refreshToken": current_refresh }))
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn logout_all_deactivates_every_session() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let first = client.register("dave@example.com", "password123").await;
    client.login("dave@example.com", "password123").await;
    let access = first.str_at("/data/accessToken");
    let refresh = first.str_at("/data/refreshToken");

    let res = client.delete_auth("/auth/sessions/logout-all", &access, json!({})).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.at("/data/revoked"), 2);

    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.at("/data").as_array().expect("session array").len(), 0);

    // Linked refresh tokens went with them.
    let res = client.post("/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn refresh_rotation_replaces_the_session_row() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let res = client.register("erin@example.com", "password123").await;
    let access = res.str_at("/data/accessToken");
    let refresh = res.str_at("/data/refreshToken");

    let res = client.post("/auth/refresh", json!({ "refreshToken": refresh })).await;
    assert_eq!(res.status, 200);

    // Still exactly one active session: the old one was deactivated when its
    // refresh token was consumed.
    let res = client.get_auth("/auth/sessions", &access).await;
    assert_eq!(res.at("/data").as_array().expect("session array").len(), 1);
}
