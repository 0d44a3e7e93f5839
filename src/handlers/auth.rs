//! # Authentication Handlers
//!
//! This module implements HTTP handlers for account sign-up and sign-in. Two
//! kinds of accounts exist:
//!
//! 1. Local accounts, identified by email and an argon2-hashed password
//! 2. Google accounts, created on the first sign-in with a verified ID token
//!
//! Every successful call returns a fresh access token, so registering also
//! signs the user in.

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{AppState, Provider, Role, User};
use crate::services::password::{hash_password, verify_password};

/// Request payload for registering a local account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// Request payload for signing in with email and password
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request payload for signing in with Google
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: Option<String>,
}

/// Response containing the access token after successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn issue_token(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state
        .jwt_service
        .create_access_token(user.id, user.role)
        .map_err(|e| {
            error!(error = %e, "Failed to create access token");
            AppError::Internal("Failed to create token")
        })?;

    Ok(AuthResponse {
        success: true,
        token,
        id: user.id,
        name: user.name.clone(),
        role: user.role,
    })
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Registers a local account and signs it in.
///
/// POST /api/auth/register
///
/// # Returns
///
/// - `201 Created` with [`AuthResponse`] - Account created
/// - `400 Bad Request` - Missing email or password, invalid email or role
/// - `409 Conflict` - Email already registered
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    debug!("Processing registration request");

    if payload.validate().is_err() {
        warn!("Invalid email format provided");
        return Err(AppError::BadRequest("invalid email"));
    }

    let (Some(email), Some(password)) = (non_blank(payload.email), payload.password) else {
        warn!("Registration without email or password");
        return Err(AppError::BadRequest("email and password required"));
    };
    if password.is_empty() {
        return Err(AppError::BadRequest("email and password required"));
    }

    let role = match non_blank(payload.role) {
        Some(role) => role.parse::<Role>().map_err(|_| {
            warn!(%role, "Registration with invalid role");
            AppError::BadRequest("invalid role")
        })?,
        None => Role::User,
    };

    if let Some(existing) = User::find_by_email(&state.db_pool, &email).await? {
        warn!(provider = ?existing.provider, "Email already registered");
        return Err(match existing.provider {
            Provider::Google => {
                AppError::Conflict("email registered with Google. Use Google login.")
            }
            Provider::Local => AppError::Conflict("email already registered"),
        });
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("Failed to hash password")
    })?;

    let name = non_blank(payload.name)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, phone, password_hash, provider, role, last_login)
        VALUES ($1, $2, $3, $4, 'local', $5, now())
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&email)
    .bind(non_blank(payload.phone))
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            warn!("Email registered concurrently");
            AppError::Conflict("email already registered")
        } else {
            AppError::Db(e)
        }
    })?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok((StatusCode::CREATED, Json(issue_token(&state, &user)?)))
}

/// Signs in a local account.
///
/// POST /api/auth/login
///
/// # Returns
///
/// - `200 OK` with [`AuthResponse`]
/// - `400 Bad Request` - Missing email or password
/// - `401 Unauthorized` - Unknown email, wrong password or Google-only account
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    debug!("Processing login request");

    let (Some(email), Some(password)) = (non_blank(payload.email), payload.password) else {
        return Err(AppError::BadRequest("email and password required"));
    };

    let Some(user) = User::find_by_email(&state.db_pool, &email).await? else {
        warn!("Login attempt for unknown email");
        return Err(AppError::Unauthorized("invalid credentials"));
    };

    let Some(password_hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "Password login attempted on Google account");
        return Err(AppError::Unauthorized("invalid credentials"));
    };

    let matches = verify_password(password_hash, &password).map_err(|e| {
        error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
        AppError::Internal("Failed to verify password")
    })?;
    if !matches {
        warn!(user_id = %user.id, "Wrong password");
        return Err(AppError::Unauthorized("invalid credentials"));
    }

    User::touch_last_login(&state.db_pool, user.id).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_token(&state, &user)?))
}

/// Signs in with a Google ID token, creating the account on first use.
///
/// POST /api/auth/google
///
/// # Returns
///
/// - `200 OK` with [`AuthResponse`]
/// - `400 Bad Request` - Missing `idToken`
/// - `401 Unauthorized` - Token failed verification
/// - `409 Conflict` - Email belongs to a local account
/// - `500 Internal Server Error` - Google sign-in not configured
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GoogleLoginRequest>,
) -> AppResult<impl IntoResponse> {
    debug!("Processing Google sign-in request");

    let Some(id_token) = non_blank(payload.id_token) else {
        return Err(AppError::BadRequest("idToken required"));
    };

    let Some(verifier) = state.google_verifier.as_ref() else {
        error!("Google sign-in requested but no client id is configured");
        return Err(AppError::Internal("Google client not configured"));
    };

    let identity = verifier.verify(&id_token).await.map_err(|e| {
        warn!(error = %e, "Google ID token verification failed");
        AppError::Unauthorized("invalid google token")
    })?;

    let user = match User::find_by_email(&state.db_pool, &identity.email).await? {
        None => {
            let name = identity
                .name
                .clone()
                .unwrap_or_else(|| "Google User".to_string());
            let user = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (name, email, provider, google_id, role, last_login)
                VALUES ($1, $2, 'google', $3, 'user', now())
                RETURNING *
                "#,
            )
            .bind(&name)
            .bind(&identity.email)
            .bind(&identity.google_id)
            .fetch_one(&state.db_pool)
            .await?;
            info!(user_id = %user.id, "Created Google account");
            user
        }
        Some(user) if user.provider != Provider::Google => {
            warn!(user_id = %user.id, "Google sign-in for a password account");
            return Err(AppError::Conflict("email already registered with password"));
        }
        Some(user) => {
            let user = sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET google_id = COALESCE(google_id, $2), last_login = now(), updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user.id)
            .bind(&identity.google_id)
            .fetch_one(&state.db_pool)
            .await?;
            debug!(user_id = %user.id, "Existing Google account signed in");
            user
        }
    };

    Ok(Json(issue_token(&state, &user)?))
}
