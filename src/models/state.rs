use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, info};

use crate::services::{google::GoogleVerifier, jwt::JwtService, upload::ImageNormalizer};

/// Application state shared across requests. Needs to be thread-safe.
pub struct AppState {
    /// The PostgreSQL database connection pool.
    pub db_pool: PgPool,
    /// JWT service for token generation and validation.
    pub jwt_service: JwtService,
    /// Google ID token verifier; `None` disables Google sign-in.
    pub google_verifier: Option<Arc<dyn GoogleVerifier>>,
    /// Writes processed product images below the upload root.
    pub normalizer: ImageNormalizer,
}

impl AppState {
    /// Creates a new application state with the provided services.
    pub fn new(
        db_pool: PgPool,
        jwt_service: JwtService,
        google_verifier: Option<Arc<dyn GoogleVerifier>>,
        normalizer: ImageNormalizer,
    ) -> Self {
        info!("Initializing application state");
        debug!(
            google_sign_in = google_verifier.is_some(),
            upload_dir = %normalizer.upload_dir().display(),
            "Application state configured"
        );

        Self {
            db_pool,
            jwt_service,
            google_verifier,
            normalizer,
        }
    }
}
