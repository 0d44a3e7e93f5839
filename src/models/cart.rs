//! # Cart Types
//!
//! Cart lines store a snapshot of the product taken when it was added, so a
//! later catalog edit or deletion does not change what the cart shows.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Media, Price, Product, Rating};
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    #[serde(rename = "_id")]
    pub product_id: Uuid,
    /// Product code at snapshot time
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub price: Price,
    pub media: Media,
    pub stock: i32,
    pub rating: Rating,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        ProductSnapshot {
            product_id: product.id,
            id: product.code.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            sub_category: product.sub_category.clone(),
            price: product.price.clone(),
            media: product.media.0.clone(),
            stock: product.stock,
            rating: product.rating.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip)]
    pub product_id: Uuid,
    pub product: Json<ProductSnapshot>,
    pub quantity: i32,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
    pub unit_price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CartItem {
    /// The user's cart lines in the order they were added.
    pub async fn list_for_user(db_pool: &PgPool, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;
        Ok(items)
    }
}

/// Sum of quantities over all lines.
pub fn total_items(items: &[CartItem]) -> i64 {
    items.iter().map(|item| i64::from(item.quantity)).sum()
}
