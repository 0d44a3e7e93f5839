//! # Product Handlers
//!
//! Catalog reads are public. Create, update and delete are admin-only; create
//! and update take a multipart body whose image parts run through the color
//! image pipeline in [`crate::services::upload`].
//!
//! Images written for a request that then fails to persist are removed again.
//! Images superseded by an update, or belonging to a deleted product, are
//! removed best-effort after the database change succeeded.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path as AxumPath, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::types::Json as DbJson;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::response::{DataResponse, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::models::{
    AppState, ColorInput, ColorVariant, Features, Product, ProductSummary, Shipping, SizeEntry,
    generate_product_code, parse_colors, parse_features, parse_sizes,
};
use crate::services::upload::{
    MultipartUpload, SlotImage, UploadedFile, collect_multipart, process_color_images,
    slot::derive_slot_indices,
};
use crate::utils::{file::FileManager, validator::parse_flag};

#[derive(Debug, Serialize)]
pub struct ProductListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

/// Text fields of a product multipart body, parsed and validated. Absent or
/// blank fields are `None`.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    description: Option<String>,
    features: Option<Features>,
    price: Option<f64>,
    stock: Option<i32>,
    estimated_delivery: Option<String>,
    free_shipping: Option<bool>,
    return_available: Option<bool>,
    sizes: Option<Vec<SizeEntry>>,
    colors: Option<Vec<ColorInput>>,
}

impl ProductForm {
    fn parse(upload: &MultipartUpload) -> AppResult<Self> {
        let text = |name: &str| upload.field(name).map(|v| v.trim().to_string());

        let price = upload
            .field("price")
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite() && *p >= 0.0)
                    .ok_or(AppError::BadRequest("Invalid price"))
            })
            .transpose()?;

        let stock = upload
            .field("stock")
            .map(|raw| {
                raw.trim()
                    .parse::<i32>()
                    .ok()
                    .filter(|s| *s >= 0)
                    .ok_or(AppError::BadRequest("Invalid stock"))
            })
            .transpose()?;

        Ok(ProductForm {
            name: text("name"),
            brand: text("brand"),
            category: text("category"),
            sub_category: text("subCategory"),
            description: text("description"),
            features: upload.field("features").map(parse_features).transpose()?,
            price,
            stock,
            estimated_delivery: text("estimatedDelivery"),
            free_shipping: upload.fields.get("freeShipping").map(|v| parse_flag(v)),
            return_available: upload.fields.get("returnAvailable").map(|v| parse_flag(v)),
            sizes: upload.field("sizes").map(parse_sizes).transpose()?,
            colors: upload.field("colors").map(parse_colors).transpose()?,
        })
    }
}

/// Splices processed image URLs into their color slots. Null slots and
/// indices past the end of `colors` leave the color untouched.
fn apply_slot_images(colors: &mut [ColorVariant], results: &[SlotImage]) {
    for result in results {
        let Some(image) = &result.image else {
            continue;
        };
        match colors.get_mut(result.index) {
            Some(color) => color.image = image.url.clone(),
            None => warn!(index = result.index, "Processed image for a color that does not exist"),
        }
    }
}

/// Removes files written for a request whose database change failed.
async fn discard_processed(results: &[SlotImage]) {
    for image in results.iter().filter_map(|r| r.image.as_ref()) {
        FileManager::cleanup_file(&image.path).await;
    }
}

/// Removes the files behind public image URLs. URLs outside the upload root
/// are skipped.
async fn remove_images<'a>(upload_dir: &Path, urls: impl IntoIterator<Item = &'a str>) {
    for url in urls {
        match FileManager::path_from_public_url(upload_dir, url) {
            Some(path) => FileManager::cleanup_file(&path).await,
            None => debug!(%url, "Image URL not under the upload root, skipping removal"),
        }
    }
}

fn explicit_indices(colors: &[ColorVariant]) -> Vec<usize> {
    (0..colors.len()).collect()
}

/// Slot indices named by the uploaded field names, limited to colors that
/// exist so no image is written for a slot that would be discarded.
fn existing_slot_indices(files: &[UploadedFile], color_count: usize) -> Vec<usize> {
    derive_slot_indices(files)
        .into_iter()
        .filter(|&index| {
            let known = index < color_count;
            if !known {
                debug!(index, color_count, "Ignoring upload for a color that does not exist");
            }
            known
        })
        .collect()
}

/// Lists every product, newest first.
///
/// GET /api/products
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn list_products(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let products = Product::list_all(&state.db_pool).await?;
    debug!(count = products.len(), "Products fetched");
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        data: products,
    }))
}

/// Compact product listing for the admin dashboard.
///
/// GET /api/products/admin
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn list_products_for_admin(
    State(state): State<Arc<AppState>>,
) -> AppResult<impl IntoResponse> {
    let summaries: Vec<ProductSummary> = Product::list_all(&state.db_pool)
        .await?
        .iter()
        .map(ProductSummary::from)
        .collect();
    Ok(Json(ProductListResponse {
        success: true,
        count: summaries.len(),
        data: summaries,
    }))
}

/// GET /api/products/category/{category}
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %category))]
pub async fn list_products_by_category(
    State(state): State<Arc<AppState>>,
    AxumPath(category): AxumPath<String>,
) -> AppResult<impl IntoResponse> {
    let products = Product::list_by_category(&state.db_pool, &category).await?;
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        data: products,
    }))
}

/// GET /api/products/{id}
///
/// # Returns
///
/// - `200 OK` with the product
/// - `404 Not Found` - No product with this id
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %product_id))]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    AxumPath(product_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let product = Product::get(&state.db_pool, product_id).await?;
    Ok(Json(DataResponse::new(product)))
}

/// Creates a product from a multipart body.
///
/// POST /api/products
///
/// Color images are matched to the submitted `colors` list by index; a color
/// whose image is missing or fails to process is stored with an empty image.
///
/// # Returns
///
/// - `201 Created` with the product
/// - `400 Bad Request` - Missing or invalid fields, or a non-image file part
/// - `413 Payload Too Large` - A file part exceeds 5 MiB
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let upload = collect_multipart(multipart).await?;
    let form = ProductForm::parse(&upload)?;

    let (Some(name), Some(brand), Some(category), Some(price)) =
        (form.name, form.brand, form.category, form.price)
    else {
        warn!("Product creation with missing required fields");
        return Err(AppError::BadRequest(
            "Missing required fields: name, brand, category, price",
        ));
    };

    let mut colors = form
        .colors
        .unwrap_or_default()
        .into_iter()
        .map(ColorInput::into_variant)
        .collect::<AppResult<Vec<_>>>()?;

    let results = if upload.files.is_empty() {
        Vec::new()
    } else {
        let indices = explicit_indices(&colors);
        process_color_images(&state.normalizer, &upload.files, Some(indices.as_slice())).await
    };
    apply_slot_images(&mut colors, &results);

    let shipping = Shipping {
        free_shipping: form.free_shipping.unwrap_or(false),
        return_available: form.return_available.unwrap_or(false),
        estimated_delivery: form.estimated_delivery,
    };

    let inserted = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            code, name, brand, category, sub_category, description, features, sizes, colors,
            price_amount, price_currency, stock, shipping
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'USD', $11, $12)
        RETURNING *
        "#,
    )
    .bind(generate_product_code())
    .bind(&name)
    .bind(&brand)
    .bind(&category)
    .bind(&form.sub_category)
    .bind(&form.description)
    .bind(DbJson(form.features.unwrap_or_default()))
    .bind(DbJson(form.sizes.unwrap_or_default()))
    .bind(DbJson(&colors))
    .bind(price)
    .bind(form.stock.unwrap_or(0))
    .bind(DbJson(&shipping))
    .fetch_one(&state.db_pool)
    .await;

    let product = match inserted {
        Ok(product) => product,
        Err(e) => {
            discard_processed(&results).await;
            return Err(e.into());
        }
    };

    info!(product_id = %product.id, code = %product.code, colors = colors.len(), "Product created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "Product created successfully",
            product,
        )),
    ))
}

/// Updates a product from a multipart body. Absent fields keep their value.
///
/// PUT /api/products/{id}
///
/// With a `colors` field the color list is replaced and images are matched by
/// index against it. Without one, images are matched to the existing colors
/// by the index in their field name. Either way a color whose image is missing
/// or fails to process keeps its previous image.
///
/// # Returns
///
/// - `200 OK` with the updated product
/// - `400 Bad Request` - Invalid fields or a non-image file part
/// - `404 Not Found` - No product with this id
/// - `413 Payload Too Large` - A file part exceeds 5 MiB
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %product_id))]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    AxumPath(product_id): AxumPath<Uuid>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let existing = Product::get(&state.db_pool, product_id).await?;

    let upload = collect_multipart(multipart).await?;
    let form = ProductForm::parse(&upload)?;

    let (mut colors, indices) = match form.colors {
        Some(inputs) => {
            let mut colors = Vec::with_capacity(inputs.len());
            for (index, input) in inputs.into_iter().enumerate() {
                let carried = input.image.clone().or_else(|| {
                    existing.colors.get(index).map(|c| c.image.clone())
                });
                let mut color = input.into_variant()?;
                color.image = carried.unwrap_or_default();
                colors.push(color);
            }
            let indices = explicit_indices(&colors);
            (colors, indices)
        }
        None => {
            let colors = existing.colors.0.clone();
            let indices = existing_slot_indices(&upload.files, colors.len());
            (colors, indices)
        }
    };

    let results = if upload.files.is_empty() || indices.is_empty() {
        Vec::new()
    } else {
        process_color_images(&state.normalizer, &upload.files, Some(indices.as_slice())).await
    };
    apply_slot_images(&mut colors, &results);

    let mut shipping = existing.shipping.0.clone();
    if let Some(free_shipping) = form.free_shipping {
        shipping.free_shipping = free_shipping;
    }
    if let Some(return_available) = form.return_available {
        shipping.return_available = return_available;
    }
    if let Some(estimated_delivery) = form.estimated_delivery {
        shipping.estimated_delivery = Some(estimated_delivery);
    }

    let updated = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            name = $2,
            brand = $3,
            category = $4,
            sub_category = $5,
            description = $6,
            features = $7,
            sizes = $8,
            colors = $9,
            price_amount = $10,
            stock = $11,
            shipping = $12,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(form.name.as_ref().unwrap_or(&existing.name))
    .bind(form.brand.as_ref().unwrap_or(&existing.brand))
    .bind(form.category.as_ref().unwrap_or(&existing.category))
    .bind(form.sub_category.or_else(|| existing.sub_category.clone()))
    .bind(form.description.or_else(|| existing.description.clone()))
    .bind(DbJson(form.features.unwrap_or_else(|| existing.features.0.clone())))
    .bind(DbJson(form.sizes.unwrap_or_else(|| existing.sizes.0.clone())))
    .bind(DbJson(&colors))
    .bind(form.price.unwrap_or(existing.price.amount))
    .bind(form.stock.unwrap_or(existing.stock))
    .bind(DbJson(&shipping))
    .fetch_optional(&state.db_pool)
    .await;

    let product = match updated {
        Ok(Some(product)) => product,
        Ok(None) => {
            warn!("Product deleted while being updated");
            discard_processed(&results).await;
            return Err(AppError::NotFound("Product not found"));
        }
        Err(e) => {
            discard_processed(&results).await;
            return Err(e.into());
        }
    };

    let still_used: HashSet<&str> = product.color_image_urls().collect();
    let superseded: Vec<&str> = existing
        .color_image_urls()
        .filter(|url| !still_used.contains(url))
        .collect();
    if !superseded.is_empty() {
        debug!(count = superseded.len(), "Removing superseded color images");
        remove_images(state.normalizer.upload_dir(), superseded).await;
    }

    info!(product_id = %product.id, "Product updated");
    Ok(Json(DataResponse::with_message(
        "Product updated successfully",
        product,
    )))
}

/// Deletes a product and its color images.
///
/// DELETE /api/products/{id}
///
/// # Returns
///
/// - `200 OK` - Product deleted
/// - `404 Not Found` - No product with this id
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4(), %product_id))]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    AxumPath(product_id): AxumPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let product = sqlx::query_as::<_, Product>("DELETE FROM products WHERE id = $1 RETURNING *")
        .bind(product_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(AppError::NotFound("Product not found"))?;

    remove_images(state.normalizer.upload_dir(), product.color_image_urls()).await;

    info!(product_id = %product.id, "Product deleted");
    Ok(Json(MessageResponse::new(
        "Product and images deleted successfully",
    )))
}
