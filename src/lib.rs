//! # Storefront - E-commerce Backend
//!
//! ## Modules
//!
//! - [`handlers`] - HTTP request handlers for various endpoints
//! - [`middleware`] - Authentication and the admin gate
//! - [`models`] - Database rows, API payloads and shared state
//! - [`services`] - JWT, password hashing, Google sign-in and the product image pipeline
//! - [`utils`] - Utility functions and constants

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};
use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretSlice};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::handlers::*;
use crate::middleware::{auth_middleware, optional_auth_middleware, require_admin};
use crate::models::AppState;
use crate::services::google::{GoogleTokenInfoVerifier, GoogleVerifier};
use crate::services::jwt::JwtService;
use crate::services::upload::ImageNormalizer;
use crate::utils::constant::{MULTIPART_BODY_LIMIT, UPLOAD_URL_PREFIX};
use crate::utils::secret::get_secret;
use crate::utils::static_object::{GOOGLE_CLIENT_ID, UPLOAD_DIR};

/// Creates an Axum router with the Google verifier configured from the
/// environment.
///
/// This is a convenience function that calls [`app_with_google_verifier`]
/// with no custom verifier.
#[inline]
pub fn app(db_pool: PgPool) -> Router {
    app_with_google_verifier(db_pool, None)
}

/// Creates an Axum router with application routes and state.
///
/// # Arguments
///
/// * `db_pool` - PostgreSQL database connection pool
/// * `google_verifier` - Optional custom Google ID token verifier. If None,
///   one is built from `GOOGLE_CLIENT_ID`, and Google sign-in stays disabled
///   when that is unset
///
/// # Environment Variables
///
/// - `JWT_SECRET` or `JWT_SECRET_FILE` - Required for JWT token signing and validation
/// - `UPLOAD_DIR` - Root directory for processed images, served at `/uploads`
/// - `GOOGLE_CLIENT_ID` - OAuth client id Google ID tokens must be issued for
///
/// # Returns
///
/// A configured Axum router with all application routes and middleware
pub fn app_with_google_verifier(
    db_pool: PgPool,
    google_verifier: Option<Arc<dyn GoogleVerifier>>,
) -> Router {
    let google_verifier = google_verifier.or_else(|| match GOOGLE_CLIENT_ID.as_ref() {
        Some(client_id) => {
            info!("Google sign-in enabled");
            Some(Arc::new(GoogleTokenInfoVerifier::new(client_id.clone())) as Arc<dyn GoogleVerifier>)
        }
        None => {
            warn!("GOOGLE_CLIENT_ID not set, Google sign-in disabled");
            None
        }
    });

    let jwt_keys = SecretSlice::from(
        get_secret("JWT_SECRET_FILE", "JWT_SECRET")
            .expect("Env variable `JWT_SECRET` or `JWT_SECRET_FILE` should be set")
            .into_bytes(),
    );

    let jwt_service = JwtService::new(
        EncodingKey::from_secret(jwt_keys.expose_secret()),
        DecodingKey::from_secret(jwt_keys.expose_secret()),
    );

    let normalizer = ImageNormalizer::new(UPLOAD_DIR.as_str());
    let static_files = ServeDir::new(normalizer.upload_dir());

    let state = Arc::new(AppState::new(
        db_pool,
        jwt_service,
        google_verifier,
        normalizer,
    ));

    let auth = from_fn_with_state(Arc::clone(&state), auth_middleware);

    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/google", post(google_login))
        .route("/api/products", get(list_products))
        .route(
            "/api/products/category/{category}",
            get(list_products_by_category),
        )
        .route("/api/products/{id}", get(get_product))
        .route("/api/feedback/approved", get(get_approved_feedback));

    let optional_auth_routes = Router::new()
        .route("/api/feedback/create", post(create_feedback))
        .route_layer(from_fn_with_state(
            Arc::clone(&state),
            optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/api/cart", get(get_cart).post(add_to_cart))
        .route("/api/cart/{product_id}", delete(remove_from_cart))
        .route("/api/favorites", get(get_favorites).post(add_favorite))
        .route("/api/favorites/toggle", patch(toggle_favorite))
        .route("/api/favorites/{product_id}", delete(remove_favorite))
        .route("/api/users/profile", get(get_profile).put(update_profile))
        .route("/api/users/address", post(add_address))
        .route("/api/users/addresses", get(get_addresses))
        .route(
            "/api/users/addresses/{address_id}",
            put(update_address).delete(delete_address),
        )
        .route_layer(auth.clone());

    let product_admin_routes = Router::new()
        .route("/api/products", post(create_product))
        .route("/api/products/admin", get(list_products_for_admin))
        .route(
            "/api/products/{id}",
            put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT));

    // `require_admin` reads the user the auth layer inserted, so auth is added last
    let admin_routes = Router::new()
        .merge(product_admin_routes)
        .route("/api/users/all", get(get_all_users))
        .route("/api/users/stats", get(get_user_stats))
        .route(
            "/api/users/{id}",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/role", patch(change_user_role))
        .route("/api/feedback", get(get_all_feedback))
        .route("/api/feedback/stats", get(get_feedback_stats))
        .route("/api/feedback/{id}/status", patch(update_feedback_status))
        .route("/api/feedback/{id}", delete(delete_feedback))
        .route_layer(from_fn(require_admin))
        .route_layer(auth);

    Router::new()
        .merge(public_routes)
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .nest_service(UPLOAD_URL_PREFIX, static_files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
