//! # Profile and Address Handlers
//!
//! Authenticated users manage their own profile and address book here. The
//! profile update is shared with the admin user-management routes.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::response::{DataResponse, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Address, AddressInput, AddressPatch, AppState, UserProfile};

/// Profile fields a user (or an admin on their behalf) may change. When
/// `addresses` is present it replaces the whole address book.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub addresses: Option<Vec<AddressInput>>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    warn!(error = %e, "Address validation failed");
    AppError::Validation(e.to_string())
}

/// Applies `payload` to the user in one transaction and returns the fresh
/// profile.
pub(super) async fn update_user_record(
    db_pool: &PgPool,
    user_id: Uuid,
    payload: &UpdateUserRequest,
) -> AppResult<UserProfile> {
    if let Some(addresses) = &payload.addresses {
        for address in addresses {
            address.validate().map_err(validation_error)?;
        }
    }

    let mut tx = db_pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE($2, name), phone = COALESCE($3, phone), updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(non_blank(&payload.name))
    .bind(non_blank(&payload.phone))
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found"));
    }

    if let Some(addresses) = &payload.addresses {
        Address::replace_all(&mut tx, user_id, addresses).await?;
        debug!(count = addresses.len(), "Address book replaced");
    }

    tx.commit().await?;

    UserProfile::load(db_pool, user_id).await
}

/// GET /api/users/profile
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    debug!("Processing profile request");
    let profile = UserProfile::load(&state.db_pool, user.user_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/users/profile
///
/// # Returns
///
/// - `200 OK` with the updated profile
/// - `400 Bad Request` - An address is missing required fields
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = update_user_record(&state.db_pool, user.user_id, &payload).await?;
    info!("Profile updated");
    Ok(Json(DataResponse::with_message(
        "User updated successfully",
        profile,
    )))
}

/// POST /api/users/address
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn add_address(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddressInput>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(validation_error)?;

    let mut tx = state.db_pool.begin().await?;
    let address = Address::insert(&mut tx, user.user_id, &payload).await?;
    tx.commit().await?;

    info!(address_id = %address.id, "Address added");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message("Address added successfully", address)),
    ))
}

/// GET /api/users/addresses
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn get_addresses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let addresses = Address::list_for_user(&state.db_pool, user.user_id).await?;
    Ok(Json(DataResponse::new(addresses)))
}

/// Partially updates one of the caller's addresses.
///
/// PUT /api/users/addresses/{addressId}
///
/// # Returns
///
/// - `200 OK` with the address
/// - `404 Not Found` - No such address for this user
#[instrument(skip_all, fields(user_id = %user.user_id, %address_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn update_address(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AxumPath(address_id): AxumPath<Uuid>,
    Json(patch): Json<AddressPatch>,
) -> AppResult<impl IntoResponse> {
    patch.validate().map_err(validation_error)?;

    let mut tx = state.db_pool.begin().await?;
    let address = Address::update(&mut tx, user.user_id, address_id, &patch)
        .await?
        .ok_or(AppError::NotFound("Address not found"))?;
    tx.commit().await?;

    debug!("Address updated");
    Ok(Json(DataResponse::with_message(
        "Address updated successfully",
        address,
    )))
}

/// DELETE /api/users/addresses/{addressId}
#[instrument(skip_all, fields(user_id = %user.user_id, %address_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn delete_address(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AxumPath(address_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !Address::delete(&state.db_pool, user.user_id, address_id).await? {
        return Err(AppError::NotFound("Address not found"));
    }
    info!("Address deleted");
    Ok(Json(MessageResponse::new("Address deleted successfully")))
}
