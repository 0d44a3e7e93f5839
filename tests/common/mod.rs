#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use storefront::handlers::AuthResponse;
use storefront::services::google::{GoogleAuthError, GoogleIdentity, GoogleVerifier};
use tokio::net::TcpListener;

pub fn init_tracing_once() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("storefront=debug")
            .with_test_writer()
            .init();
    });
}

/// Google verifier accepting a fixed set of tokens.
#[derive(Debug, Default)]
pub struct MockGoogleVerifier {
    identities: HashMap<String, GoogleIdentity>,
}

impl MockGoogleVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `token` verify as the given Google account.
    pub fn with_identity(mut self, token: &str, google_id: &str, email: &str, name: &str) -> Self {
        self.identities.insert(
            token.to_string(),
            GoogleIdentity {
                google_id: google_id.to_string(),
                email: email.to_string(),
                name: Some(name.to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl GoogleVerifier for MockGoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        self.identities
            .get(id_token)
            .cloned()
            .ok_or(GoogleAuthError::Rejected)
    }
}

/// Spawns the application with a default mock Google verifier.
///
/// Returned address format: `http://127.0.0.1:8492`
pub async fn spawn_app(test_db_pool: PgPool) -> String {
    spawn_app_with_google(test_db_pool, MockGoogleVerifier::new()).await
}

pub async fn spawn_app_with_google(test_db_pool: PgPool, verifier: MockGoogleVerifier) -> String {
    dotenvy::from_filename_override("tests/data/.test.env").unwrap();
    init_tracing_once();

    // Randomly choose an available port
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port at localhost");
    let port = listener.local_addr().unwrap().port();

    let app = storefront::app_with_google_verifier(test_db_pool, Some(Arc::new(verifier)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let address = format!("http://127.0.0.1:{port}");

    // Wait for server to be ready
    let client = reqwest::Client::new();
    for _ in 0..10 {
        if client
            .get(format!("{address}/api/health"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    address
}

/// Registers a local account and returns the auth response.
pub async fn register(
    client: &reqwest::Client,
    address: &str,
    email: &str,
    password: &str,
    role: Option<&str>,
) -> AuthResponse {
    let mut body = json!({ "email": email, "password": password, "name": "Test User" });
    if let Some(role) = role {
        body["role"] = json!(role);
    }

    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&body)
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse auth response")
}

pub async fn user_token(client: &reqwest::Client, address: &str, email: &str) -> String {
    register(client, address, email, "password123", None)
        .await
        .token
}

pub async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    register(client, address, "admin@shop.test", "password123", Some("admin"))
        .await
        .token
}

/// Encodes a solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn image_part(data: Vec<u8>, file_name: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .unwrap()
}

/// Creates a product through the admin API and returns its JSON.
pub async fn create_product(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    form: reqwest::multipart::Form,
) -> Value {
    let response = client
        .post(format!("{address}/api/products"))
        .bearer_auth(admin_token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

/// Minimal valid product form without images.
pub fn basic_product_form(name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("name", name.to_string())
        .text("brand", "Acme")
        .text("category", "Shirts")
        .text("price", "25.5")
        .text("stock", "10")
}

/// Path on disk of a processed image served under `/uploads`.
pub fn upload_path(url: &str) -> std::path::PathBuf {
    let relative = url.trim_start_matches("/uploads/");
    std::path::Path::new(&std::env::var("UPLOAD_DIR").unwrap()).join(relative)
}
