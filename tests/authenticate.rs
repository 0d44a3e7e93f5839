mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use storefront::handlers::AuthResponse;
use storefront::models::Role;

use common::{MockGoogleVerifier, register, spawn_app, spawn_app_with_google};

#[sqlx::test]
async fn register_signs_the_user_in(pool: PgPool) {
    let address = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    let auth = register(&client, &address, "ann@shop.test", "secret-pw", None).await;
    assert!(auth.success);
    assert_eq!(auth.role, Role::User);
    assert_eq!(auth.name, "Test User");

    let response = client
        .get(format!("{address}/api/users/profile"))
        .bearer_auth(&auth.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["email"], "ann@shop.test");
    assert!(body["data"].get("passwordHash").is_none());

    let (hash, last_login): (Option<String>, Option<time::OffsetDateTime>) =
        sqlx::query_as("SELECT password_hash, last_login FROM users WHERE email = $1")
            .bind("ann@shop.test")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(hash.unwrap().starts_with("$argon2"));
    assert!(last_login.is_some());
}

#[sqlx::test]
async fn register_defaults_the_name_to_the_email_local_part(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&json!({"email": "bob@shop.test", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let auth: AuthResponse = response.json().await.unwrap();
    assert_eq!(auth.name, "bob");
}

#[sqlx::test]
async fn register_rejects_bad_input(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    for (body, message) in [
        (json!({"email": "a@shop.test"}), "email and password required"),
        (json!({"email": "not-an-email", "password": "pw"}), "invalid email"),
        (
            json!({"email": "a@shop.test", "password": "pw", "role": "owner"}),
            "invalid role",
        ),
    ] {
        let response = client
            .post(format!("{address}/api/auth/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], message);
    }
}

#[sqlx::test]
async fn duplicate_email_conflicts(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    register(&client, &address, "dup@shop.test", "pw", None).await;
    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&json!({"email": "dup@shop.test", "password": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test]
async fn login_checks_credentials(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    register(&client, &address, "cara@shop.test", "right-pw", Some("admin")).await;

    let response = client
        .post(format!("{address}/api/auth/login"))
        .json(&json!({"email": "cara@shop.test", "password": "right-pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let auth: AuthResponse = response.json().await.unwrap();
    assert_eq!(auth.role, Role::Admin);

    for body in [
        json!({"email": "cara@shop.test", "password": "wrong"}),
        json!({"email": "nobody@shop.test", "password": "right-pw"}),
    ] {
        let response = client
            .post(format!("{address}/api/auth/login"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = client
        .post(format!("{address}/api/auth/login"))
        .json(&json!({"email": "cara@shop.test"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test]
async fn protected_routes_require_a_valid_token(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/api/cart"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing token");

    let response = client
        .get(format!("{address}/api/cart"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn admin_routes_reject_regular_users(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let token = common::user_token(&client, &address, "plain@shop.test").await;

    let response = client
        .get(format!("{address}/api/users/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "admin only");
}

#[sqlx::test]
async fn google_sign_in_creates_then_reuses_the_account(pool: PgPool) {
    let verifier = MockGoogleVerifier::new().with_identity(
        "good-token",
        "google-123",
        "gia@gmail.test",
        "Gia",
    );
    let address = spawn_app_with_google(pool.clone(), verifier).await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = client
            .post(format!("{address}/api/auth/google"))
            .json(&json!({"idToken": "good-token"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let auth: AuthResponse = response.json().await.unwrap();
        assert_eq!(auth.name, "Gia");
        ids.push(auth.id);
    }
    assert_eq!(ids[0], ids[1]);

    let (provider_is_google, google_id): (bool, Option<String>) = sqlx::query_as(
        "SELECT provider = 'google', google_id FROM users WHERE email = 'gia@gmail.test'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(provider_is_google);
    assert_eq!(google_id.as_deref(), Some("google-123"));

    // The email cannot be claimed again with a password
    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&json!({"email": "gia@gmail.test", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test]
async fn google_sign_in_rejects_bad_tokens_and_local_emails(pool: PgPool) {
    let verifier =
        MockGoogleVerifier::new().with_identity("taken", "g-1", "local@shop.test", "Local");
    let address = spawn_app_with_google(pool, verifier).await;
    let client = reqwest::Client::new();
    register(&client, &address, "local@shop.test", "pw", None).await;

    let response = client
        .post(format!("{address}/api/auth/google"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{address}/api/auth/google"))
        .json(&json!({"idToken": "forged"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{address}/api/auth/google"))
        .json(&json!({"idToken": "taken"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
