//! # Application Constants
//!
//! This module defines configuration constants used throughout the storefront.
//! These constants control upload limits, image normalization and token lifetimes.

use std::time::Duration;

/// Maximum size of a single uploaded file part
///
/// Any part above this ceiling aborts the whole request with `413`.
pub const MAX_UPLOAD_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Body limit for multipart product routes
///
/// Large enough for several color images; the per-part ceiling above is the
/// limit that actually matters.
pub const MULTIPART_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Bounding box (width and height) processed product images must fit into
pub const PRODUCT_IMAGE_MAX_DIMENSION: u32 = 800;

/// JPEG quality used when re-encoding product images
pub const PRODUCT_IMAGE_JPEG_QUALITY: u8 = 85;

/// Content type of every processed product image
pub const PROCESSED_IMAGE_MIME: &str = "image/jpeg";

/// Directory under the upload root where processed product images live
pub const PROCESSED_IMAGE_SUBDIR: &str = "products/processed";

/// Public URL prefix under which the upload root is served
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Expiration time for JWT access tokens
pub const ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 7 days

/// Window used by the "recent" counters of the admin statistics endpoints
pub const RECENT_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default and maximum page sizes for paginated listings
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum length of a feedback message
pub const FEEDBACK_TEXT_MAX_LEN: u64 = 1000;
