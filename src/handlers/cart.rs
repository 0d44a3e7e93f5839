//! # Cart Handlers
//!
//! Every route here runs behind the authentication middleware and works on the
//! caller's own cart.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path as AxumPath, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as DbJson;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AppState, CartItem, Product, ProductSnapshot, total_items};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

/// Optional variant filters for removing cart lines
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartQuery {
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<i64>,
}

/// GET /api/cart
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let items = CartItem::list_for_user(&state.db_pool, user.user_id).await?;
    let total = total_items(&items);
    debug!(lines = items.len(), total, "Cart fetched");
    Ok(Json(CartResponse {
        items,
        total_items: Some(total),
    }))
}

/// Adds a product to the cart. A line with the same product, size and color
/// has its quantity increased instead.
///
/// POST /api/cart
///
/// # Returns
///
/// - `201 Created` with the cart lines
/// - `400 Bad Request` - Missing product id or non-positive quantity
/// - `404 Not Found` - Unknown product
#[instrument(skip_all, fields(user_id = %user.user_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(product_id) = payload.product_id else {
        return Err(AppError::BadRequest("productId required"));
    };
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        warn!(quantity, "Rejected non-positive cart quantity");
        return Err(AppError::BadRequest("quantity must be greater than 0"));
    }

    let product = Product::get(&state.db_pool, product_id).await?;

    let mut tx = state.db_pool.begin().await?;

    let merged = sqlx::query(
        r#"
        UPDATE cart_items
        SET quantity = quantity + $5, updated_at = now()
        WHERE user_id = $1
          AND product_id = $2
          AND selected_size IS NOT DISTINCT FROM $3
          AND selected_color IS NOT DISTINCT FROM $4
        "#,
    )
    .bind(user.user_id)
    .bind(product.id)
    .bind(&payload.selected_size)
    .bind(&payload.selected_color)
    .bind(quantity)
    .execute(&mut *tx)
    .await?;

    if merged.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO cart_items (
                user_id, product_id, product, quantity, selected_size, selected_color, unit_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(product.id)
        .bind(DbJson(ProductSnapshot::from(&product)))
        .bind(quantity)
        .bind(&payload.selected_size)
        .bind(&payload.selected_color)
        .bind(product.price.amount)
        .execute(&mut *tx)
        .await?;
        debug!(product_id = %product.id, "New cart line");
    } else {
        debug!(product_id = %product.id, "Merged into existing cart line");
    }

    tx.commit().await?;

    let items = CartItem::list_for_user(&state.db_pool, user.user_id).await?;
    info!(product_id = %product.id, quantity, "Added to cart");
    Ok((
        StatusCode::CREATED,
        Json(CartResponse {
            items,
            total_items: None,
        }),
    ))
}

/// Removes a product from the cart. Size and color query parameters narrow
/// the removal to matching lines.
///
/// DELETE /api/cart/{productId}
#[instrument(skip_all, fields(user_id = %user.user_id, %product_id, request_id = %uuid::Uuid::new_v4()))]
pub async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    AxumPath(product_id): AxumPath<Uuid>,
    Query(filter): Query<RemoveFromCartQuery>,
) -> AppResult<impl IntoResponse> {
    let removed = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE user_id = $1
          AND product_id = $2
          AND ($3::text IS NULL OR selected_size = $3)
          AND ($4::text IS NULL OR selected_color = $4)
        "#,
    )
    .bind(user.user_id)
    .bind(product_id)
    .bind(&filter.selected_size)
    .bind(&filter.selected_color)
    .execute(&state.db_pool)
    .await?;

    debug!(removed = removed.rows_affected(), "Cart lines removed");
    let items = CartItem::list_for_user(&state.db_pool, user.user_id).await?;
    Ok(Json(CartResponse {
        items,
        total_items: None,
    }))
}
