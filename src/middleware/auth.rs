//! # Authentication Middleware
//!
//! This module contains the authentication middleware that validates JWT tokens
//! and provides user context to protected routes, plus the admin gate layered
//! behind it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, instrument, trace, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AppState, Role};
use crate::services::jwt::Claims;

/// Authentication middleware for protecting routes
///
/// This middleware validates JWT access tokens from the Authorization header
/// and extracts user information for use by downstream handlers.
///
/// # Authentication Flow
///
/// 1. Extracts `Authorization` header with `Bearer <token>` format
/// 2. Validates the JWT token signature and expiration
/// 3. Parses user ID from token claims
/// 4. Adds [`AuthUser`] to request extensions for handler access
///
/// # Returns
///
/// - **Success**: Continues to next handler with user context
/// - **Failure**: Returns `401 Unauthorized` for invalid/missing tokens
#[instrument(
    skip_all,
    fields(
        method = %req.method(),
        uri = %req.uri(),
        request_id = %uuid::Uuid::new_v4()
    )
)]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    trace!("Processing authentication middleware");

    let Some(token) = bearer_token(&req) else {
        warn!("Missing or malformed Authorization header");
        return Err(AppError::Unauthorized("Missing token"));
    };

    let user = authenticate(&state, token).ok_or(AppError::Unauthorized("Invalid token"))?;
    debug!(user_id = %user.user_id, role = %user.role, "Authentication successful");
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Attaches an [`AuthUser`] when a valid bearer token is present and lets the
/// request through either way.
#[instrument(skip_all, fields(uri = %req.uri()))]
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(user) = bearer_token(&req).and_then(|token| authenticate(&state, token)) {
        debug!(user_id = %user.user_id, "Optional authentication succeeded");
        req.extensions_mut().insert(user);
    } else {
        trace!("Proceeding without authenticated user");
    }

    next.run(req).await
}

/// Rejects non-admin users with `403`. Must run after [`auth_middleware`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<AuthUser>() {
        Some(user) if user.role.is_admin() => Ok(next.run(req).await),
        Some(user) => {
            warn!(user_id = %user.user_id, "Non-admin user denied access to admin route");
            Err(AppError::Forbidden("admin only"))
        }
        None => {
            error!("Admin check ran without an authenticated user");
            Err(AppError::Unauthorized("Missing token"))
        }
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

fn authenticate(state: &AppState, token: &str) -> Option<AuthUser> {
    let claims = state
        .jwt_service
        .validate_access_token(token)
        .map_err(|e| warn!(error = %e, "Token validation failed"))
        .ok()?;

    let user_id = Uuid::try_parse(&claims.sub)
        .map_err(|e| error!(error = %e, "Failed to parse user ID from token claims"))
        .ok()?;

    Some(AuthUser {
        user_id,
        role: claims.role,
        claims,
    })
}

/// Authenticated user information available to handlers
///
/// This struct is inserted into request extensions by the authentication
/// middleware and can be extracted by route handlers that need user context.
///
/// # Usage in Handlers
///
/// ```rust
/// use axum::{extract::Extension, response::IntoResponse};
/// use storefront::middleware::AuthUser;
/// async fn protected_handler(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
///     format!("Hello user: {}", user.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Unique identifier for the authenticated user
    pub user_id: Uuid,
    /// Role at the time the token was issued
    pub role: Role,
    /// JWT claims containing additional token metadata
    pub claims: Claims,
}
