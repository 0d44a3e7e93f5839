//! # Favorite Handlers
//!
//! A user's favorites are a set of products. Each mutating route answers with
//! the full, current list.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AppState, Product};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ToggleFavoriteResponse {
    pub favorited: bool,
    pub favorites: Vec<Product>,
}

async fn favorites_of(db_pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT p.* FROM products p
        JOIN favorites f ON f.product_id = p.id
        WHERE f.user_id = $1
        ORDER BY f.created_at, p.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(products)
}

fn require_product_id(payload: &FavoriteRequest) -> AppResult<Uuid> {
    payload
        .product_id
        .ok_or(AppError::BadRequest("productId required"))
}

/// GET /api/favorites
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn get_favorites(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(favorites_of(&state.db_pool, user.user_id).await?))
}

/// Adds a product to the favorites. Adding it twice is a no-op.
///
/// POST /api/favorites
///
/// # Returns
///
/// - `201 Created` with the favorite products
/// - `404 Not Found` - Unknown product
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<FavoriteRequest>,
) -> AppResult<impl IntoResponse> {
    let product_id = require_product_id(&payload)?;
    let product = Product::get(&state.db_pool, product_id).await?;

    sqlx::query(
        "INSERT INTO favorites (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user.user_id)
    .bind(product.id)
    .execute(&state.db_pool)
    .await?;

    info!(product_id = %product.id, "Favorite added");
    Ok((
        StatusCode::CREATED,
        Json(favorites_of(&state.db_pool, user.user_id).await?),
    ))
}

/// DELETE /api/favorites/{productId}
#[instrument(skip_all, fields(user_id = %user.user_id, %product_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AxumPath(product_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(&state.db_pool)
        .await?;
    debug!(removed = result.rows_affected(), "Favorite removed");

    Ok(Json(favorites_of(&state.db_pool, user.user_id).await?))
}

/// Flips whether a product is a favorite.
///
/// PATCH /api/favorites/toggle
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<FavoriteRequest>,
) -> AppResult<impl IntoResponse> {
    let product_id = require_product_id(&payload)?;

    let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(&state.db_pool)
        .await?
        .rows_affected()
        > 0;

    let favorited = if removed {
        false
    } else {
        let product = Product::get(&state.db_pool, product_id).await?;
        sqlx::query(
            "INSERT INTO favorites (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user.user_id)
        .bind(product.id)
        .execute(&state.db_pool)
        .await?;
        true
    };

    info!(%product_id, favorited, "Favorite toggled");
    Ok(Json(ToggleFavoriteResponse {
        favorited,
        favorites: favorites_of(&state.db_pool, user.user_id).await?,
    }))
}
