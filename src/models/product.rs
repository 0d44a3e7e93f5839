//! # Product Catalog Types
//!
//! Products keep their nested data (features, sizes, color variants, media and
//! shipping) in JSONB columns. Color variants are ordered; their index is the
//! slot a color image upload is matched against.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::utils::validator::{HEX_COLOR_REGEX, validate_size};

const DEFAULT_HEX_CODE: &str = "#000000";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub fabric: Option<String>,
    pub pattern: Option<String>,
    pub fit: Option<String>,
    pub neck: Option<String>,
    pub sleeve: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub size: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariant {
    pub name: String,
    pub hex_code: String,
    /// Public URL of the processed image, empty when the color has none
    #[serde(default)]
    pub image: String,
}

/// A color as submitted in the `colors` form field. Either `hex` or
/// `hexCode` may carry the color code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInput {
    pub name: String,
    pub hex: Option<String>,
    pub hex_code: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Price {
    #[sqlx(rename = "price_currency")]
    pub currency: String,
    #[sqlx(rename = "price_amount")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Rating {
    #[sqlx(rename = "rating_average")]
    pub average: f64,
    #[sqlx(rename = "rating_count")]
    pub count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub images: Vec<String>,
    pub video: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub return_available: bool,
    pub estimated_delivery: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Human-facing product code, `PROD_<millis>_<random>`
    #[serde(rename = "id")]
    pub code: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: Option<String>,
    pub features: Json<Features>,
    pub sizes: Json<Vec<SizeEntry>>,
    pub colors: Json<Vec<ColorVariant>>,
    #[sqlx(flatten)]
    pub price: Price,
    pub stock: i32,
    #[sqlx(flatten)]
    pub rating: Rating,
    pub media: Json<Media>,
    pub shipping: Json<Shipping>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row of the compact admin listing
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price: f64,
    /// Image of the first color, if the product has colors
    pub image: Option<String>,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.amount,
            image: product.colors.first().map(|c| c.image.clone()),
        }
    }
}

impl ColorInput {
    /// Converts to a stored variant with an empty image.
    pub fn into_variant(self) -> AppResult<ColorVariant> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Every color needs a name"));
        }
        let hex_code = self
            .hex
            .or(self.hex_code)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HEX_CODE.to_string());
        if !HEX_COLOR_REGEX.is_match(&hex_code) {
            return Err(AppError::Validation(format!(
                "Invalid hex color '{hex_code}'"
            )));
        }
        Ok(ColorVariant {
            name: self.name,
            hex_code,
            image: String::new(),
        })
    }
}

/// Parses the JSON `colors` form field.
pub fn parse_colors(raw: &str) -> AppResult<Vec<ColorInput>> {
    serde_json::from_str(raw).map_err(|_| AppError::BadRequest("Invalid colors JSON"))
}

/// Parses the JSON `sizes` form field into entries marked available.
pub fn parse_sizes(raw: &str) -> AppResult<Vec<SizeEntry>> {
    let sizes: Vec<String> =
        serde_json::from_str(raw).map_err(|_| AppError::BadRequest("Invalid sizes JSON"))?;

    sizes
        .into_iter()
        .map(|size| {
            validate_size(&size).map_err(AppError::Validation)?;
            Ok(SizeEntry {
                size,
                available: true,
            })
        })
        .collect()
}

/// Parses the JSON `features` form field.
pub fn parse_features(raw: &str) -> AppResult<Features> {
    serde_json::from_str(raw).map_err(|_| AppError::BadRequest("Invalid features JSON"))
}

/// Generates a product code, `PROD_<unix millis>_<9 base36 chars>`.
pub fn generate_product_code() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("PROD_{millis}_{suffix}")
}

impl Product {
    pub async fn find_by_id(db_pool: &PgPool, product_id: Uuid) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(db_pool)
            .await?;
        Ok(product)
    }

    /// Like [`Product::find_by_id`], mapping absence to `404`.
    pub async fn get(db_pool: &PgPool, product_id: Uuid) -> AppResult<Product> {
        Self::find_by_id(db_pool, product_id)
            .await?
            .ok_or(AppError::NotFound("Product not found"))
    }

    /// All products, newest first.
    pub async fn list_all(db_pool: &PgPool) -> AppResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC, id")
                .fetch_all(db_pool)
                .await?;
        Ok(products)
    }

    pub async fn list_by_category(db_pool: &PgPool, category: &str) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE category = $1 ORDER BY created_at DESC, id",
        )
        .bind(category)
        .fetch_all(db_pool)
        .await?;
        Ok(products)
    }

    /// Public URLs of every color image the product references.
    pub fn color_image_urls(&self) -> impl Iterator<Item = &str> {
        self.colors
            .iter()
            .map(|c| c.image.as_str())
            .filter(|url| !url.is_empty())
    }
}
