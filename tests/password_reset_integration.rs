//! Integration tests for the forgot-password / reset-password flow

mod helpers;

use chainsim_auth::auth::hash_token;
use chainsim_auth::configuration::Environment;
use chainsim_auth::user_store::UserRepository;
use chrono::{Duration, Utc};
use helpers::{spawn_app, spawn_app_with, test_settings, token_of, TestApp, PASSWORD};
use serde_json::{json, Value};

async fn forgot(app: &TestApp, email: &str) -> Value {
    let response = app
        .post_json("/auth/forgot-password", &json!({ "email": email }))
        .await;
    assert_eq!(200, response.status().as_u16());
    response.json().await.unwrap()
}

async fn reset(app: &TestApp, token: &str, password: &str) -> reqwest::Response {
    app.post_json(
        "/auth/reset-password",
        &json!({ "token": token, "password": password }),
    )
    .await
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_generic() {
    let app = spawn_app().await;

    let body = forgot(&app, "nobody@example.com").await;
    assert_eq!(body["success"], true);
    assert!(body["message"].is_string());
    assert!(body.get("resetToken").is_none());
}

#[tokio::test]
async fn forgot_password_responses_do_not_reveal_accounts() {
    let app = spawn_app_with({
        let mut settings = test_settings();
        settings.application.environment = Environment::Production;
        settings
    })
    .await;
    app.register_ok("known@example.com").await;

    let known = forgot(&app, "known@example.com").await;
    let unknown = forgot(&app, "unknown@example.com").await;
    let malformed = forgot(&app, "not-an-email").await;

    assert_eq!(known, unknown);
    assert_eq!(known, malformed);
    assert!(known.get("resetToken").is_none());

    // the ticket was still issued for the real account
    let user = app
        .users
        .find_by_email("known@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.password_reset_token_hash.is_some());
}

#[tokio::test]
async fn reset_password_end_to_end() {
    let app = spawn_app().await;
    let registered = app.register_ok("reset@example.com").await;
    let old_token = token_of(&registered);

    let body = forgot(&app, "reset@example.com").await;
    let secret = body["resetToken"].as_str().expect("token outside production");

    // only the hash is stored
    let user = app
        .users
        .find_by_email("reset@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password_reset_token_hash.as_deref(), Some(secret));

    let response = reset(&app, secret, "brandnew789").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    assert_eq!(401, app.me(&old_token).await.status().as_u16());
    assert_eq!(200, app.login("reset@example.com", "brandnew789").await.status().as_u16());
    assert_eq!(401, app.login("reset@example.com", PASSWORD).await.status().as_u16());

    // single use
    let response = reset(&app, secret, "another1234").await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn reset_password_rejects_unknown_token() {
    let app = spawn_app().await;

    let response = reset(&app, "does-not-exist", "brandnew789").await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn reset_password_rejects_expired_token() {
    let app = spawn_app().await;
    app.register_ok("late@example.com").await;
    let body = forgot(&app, "late@example.com").await;
    let secret = body["resetToken"].as_str().unwrap().to_string();

    let user = app
        .users
        .find_by_email("late@example.com")
        .await
        .unwrap()
        .unwrap();
    app.users
        .set_password_reset(user.id, &hash_token(&secret), Utc::now() - Duration::seconds(1))
        .await
        .unwrap();

    let response = reset(&app, &secret, "brandnew789").await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(200, app.login("late@example.com", PASSWORD).await.status().as_u16());
}

#[tokio::test]
async fn reset_password_validates_new_password_first() {
    let app = spawn_app().await;
    app.register_ok("weak@example.com").await;
    let body = forgot(&app, "weak@example.com").await;
    let secret = body["resetToken"].as_str().unwrap().to_string();

    let response = reset(&app, &secret, "short").await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // the ticket survives a rejected password
    let response = reset(&app, &secret, "goodpass123").await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn new_forgot_request_replaces_previous_ticket() {
    let app = spawn_app().await;
    app.register_ok("twice@example.com").await;

    let first = forgot(&app, "twice@example.com").await;
    let second = forgot(&app, "twice@example.com").await;

    let response = reset(&app, first["resetToken"].as_str().unwrap(), "brandnew789").await;
    assert_eq!(400, response.status().as_u16());

    let response = reset(&app, second["resetToken"].as_str().unwrap(), "brandnew789").await;
    assert_eq!(200, response.status().as_u16());
}
