//! # Upload Intake
//!
//! Buffers every part of a multipart request in memory. File parts are
//! checked against the image content-type rule and the per-part size ceiling
//! as they stream in, so a bad part rejects the request before any image is
//! decoded or written.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{debug, error, instrument, trace, warn};

use crate::error::{AppError, AppResult};
use crate::utils::file::ImageUploadValidator;

/// A file part held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field name, e.g. `colorImage_0` or `colors[1][image]`
    pub field_name: String,
    /// Filename as sent by the client
    pub original_name: String,
    /// Declared content type
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Text fields and file parts of one multipart request, in arrival order.
#[derive(Debug, Default)]
pub struct MultipartUpload {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartUpload {
    /// Returns a text field, treating blank values as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Reads a whole multipart body into memory.
///
/// # Returns
///
/// - `Ok(MultipartUpload)` - All parts read, files in arrival order
/// - `Err(AppError::BadRequest)` - Malformed body or a non-image file part
/// - `Err(AppError::PayloadTooLarge)` - A file part exceeds 5 MiB, or the body
///   exceeds the route's body limit
#[instrument(skip_all)]
pub async fn collect_multipart(mut multipart: Multipart) -> AppResult<MultipartUpload> {
    let mut upload = MultipartUpload::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(multipart_error)?;
            trace!(field_name = %field_name, "Read text field");
            upload.fields.insert(field_name, value);
            continue;
        };

        // Browsers send an unnamed empty part for a file input left blank
        if original_name.is_empty() {
            trace!(field_name = %field_name, "Skipping empty file input");
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        ImageUploadValidator::validate_content_type(&content_type).map_err(|e| {
            warn!(field_name = %field_name, error = %e, "Rejected non-image upload");
            AppError::BadRequest("Only image files are allowed")
        })?;

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            ImageUploadValidator::validate_file_size(data.len() + chunk.len()).map_err(|e| {
                warn!(field_name = %field_name, error = %e, "Rejected oversized upload");
                AppError::PayloadTooLarge(e)
            })?;
            data.extend_from_slice(&chunk);
        }

        debug!(
            field_name = %field_name,
            original_name = %original_name,
            content_type = %content_type,
            size = data.len(),
            "Buffered uploaded file"
        );

        upload.files.push(UploadedFile {
            field_name,
            original_name,
            content_type,
            data: Bytes::from(data),
        });
    }

    debug!(
        files = upload.files.len(),
        fields = upload.fields.len(),
        "Multipart body collected"
    );
    Ok(upload)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %e, "Multipart body exceeds limit");
        AppError::PayloadTooLarge("Request body too large")
    } else {
        error!(error = %e, "Error reading multipart form");
        AppError::BadRequest("Invalid multipart data")
    }
}
