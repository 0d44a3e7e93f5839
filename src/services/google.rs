//! # Google Sign-In
//!
//! Verification of Google ID tokens behind the [`GoogleVerifier`] trait, so
//! tests can substitute a mock the same way the router accepts one.
//!
//! ## Implementations
//!
//! - [`GoogleTokenInfoVerifier`] - Asks Google's `tokeninfo` endpoint and
//!   checks the audience against the configured client id

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Errors that can occur while verifying a Google ID token
#[derive(Debug, Error)]
pub enum GoogleAuthError {
    #[error("token rejected by Google")]
    Rejected,
    #[error("token issued for another client")]
    AudienceMismatch,
    #[error("token carries no email")]
    MissingEmail,
    #[error("request to Google failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Identity extracted from a verified ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Google account id (`sub` claim)
    pub google_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Trait for Google ID token verification
#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    /// Verifies `id_token` and returns the identity it asserts.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleAuthError`] if the token is invalid, expired, issued
    /// for another client, or Google cannot be reached.
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    aud: String,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
}

/// Verifier backed by Google's `tokeninfo` endpoint
pub struct GoogleTokenInfoVerifier {
    client_id: String,
    http_client: reqwest::Client,
}

impl GoogleTokenInfoVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GoogleVerifier for GoogleTokenInfoVerifier {
    #[instrument(skip_all, fields(token_length = id_token.len()))]
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        debug!("Verifying Google ID token");

        let response = self
            .http_client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Request to Google tokeninfo failed");
                e
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Google rejected ID token");
            return Err(GoogleAuthError::Rejected);
        }

        let info: TokenInfo = response.json().await?;

        if info.aud != self.client_id {
            warn!(aud = %info.aud, "ID token audience mismatch");
            return Err(GoogleAuthError::AudienceMismatch);
        }

        let email = info.email.ok_or(GoogleAuthError::MissingEmail)?;
        debug!(google_id = %info.sub, "Google ID token verified");

        Ok(GoogleIdentity {
            google_id: info.sub,
            email,
            name: info.name.or(info.given_name),
        })
    }
}
