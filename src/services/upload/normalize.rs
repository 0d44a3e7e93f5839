//! # Image Normalizer
//!
//! Turns each resolved upload into a JPEG that fits an 800×800 box and writes
//! it under `<upload dir>/products/processed/`. A failure at any stage only
//! costs the slot being processed: the caller gets `None` for it and the
//! remaining slots go on.

use std::path::PathBuf;

use image::ImageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use super::intake::UploadedFile;
use super::slot::SlotMatch;
use crate::utils::{
    constant::{
        PROCESSED_IMAGE_MIME, PROCESSED_IMAGE_SUBDIR, PRODUCT_IMAGE_JPEG_QUALITY,
        PRODUCT_IMAGE_MAX_DIMENSION, UPLOAD_URL_PREFIX,
    },
    file::{FileManager, ImageProcessor},
};

/// A normalized image written to disk. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub original_name: String,
    pub filename: String,
    pub path: PathBuf,
    /// Public URL, `/uploads/products/processed/<filename>`
    pub url: String,
    /// Size of the encoded file as read back from disk
    pub size: u64,
    pub mimetype: String,
}

/// Errors that fail a single slot
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Normalizes product images into the processed directory of an upload root.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    upload_dir: PathBuf,
    max_dimension: u32,
    quality: u8,
}

impl ImageNormalizer {
    /// Creates a normalizer writing below `upload_dir` with the standard
    /// bounding box and JPEG quality.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_dimension: PRODUCT_IMAGE_MAX_DIMENSION,
            quality: PRODUCT_IMAGE_JPEG_QUALITY,
        }
    }

    #[inline]
    pub fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }

    /// Directory processed images are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.upload_dir.join(PROCESSED_IMAGE_SUBDIR)
    }

    /// Decodes, resizes, re-encodes and writes one upload.
    ///
    /// The CPU-bound part runs on the blocking pool and is awaited before
    /// returning, so callers stay sequential.
    ///
    /// # Errors
    ///
    /// - [`NormalizeError::Decode`] - Corrupt, truncated or unsupported image
    /// - [`NormalizeError::Encode`] - JPEG encoding failed
    /// - [`NormalizeError::Io`] - Directory creation, write or read-back failed
    #[instrument(
        skip_all,
        fields(field_name = %file.field_name, original_name = %file.original_name, size = file.len())
    )]
    pub async fn normalize(&self, file: &UploadedFile) -> Result<ProcessedImage, NormalizeError> {
        let data = file.data.clone();
        let max_dimension = self.max_dimension;
        let quality = self.quality;

        let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, NormalizeError> {
            trace!("Decoding");
            let img = ImageProcessor::decode(&data).map_err(NormalizeError::Decode)?;
            trace!("Resizing");
            let img = ImageProcessor::resize_to_fit(img, max_dimension);
            trace!("Encoding");
            ImageProcessor::encode_jpeg(&img, quality).map_err(NormalizeError::Encode)
        })
        .await??;

        let output_dir = self.output_dir();
        FileManager::ensure_directory_exists(&output_dir).await?;

        let filename = FileManager::generate_processed_filename(&file.original_name);
        let path = output_dir.join(&filename);
        FileManager::save_new_file(&path, &encoded).await?;

        let size = match FileManager::file_size(&path).await {
            Ok(size) => size,
            Err(e) => {
                FileManager::cleanup_file(&path).await;
                return Err(e.into());
            }
        };

        debug!(filename = %filename, size, "Processed image written");

        Ok(ProcessedImage {
            original_name: file.original_name.clone(),
            url: format!("{UPLOAD_URL_PREFIX}/{PROCESSED_IMAGE_SUBDIR}/{filename}"),
            filename,
            path,
            size,
            mimetype: PROCESSED_IMAGE_MIME.to_string(),
        })
    }

    /// Normalizes every resolved slot in order.
    ///
    /// Slots without a file and slots whose processing fails yield `None`.
    /// The output has exactly one entry per slot.
    #[instrument(skip_all, fields(slots = slots.len()))]
    pub async fn normalize_slots(&self, slots: &[SlotMatch<'_>]) -> Vec<Option<ProcessedImage>> {
        let mut results = Vec::with_capacity(slots.len());

        for slot in slots {
            let Some(file) = slot.file else {
                debug!(index = slot.index, "No file found for slot");
                results.push(None);
                continue;
            };

            match self.normalize(file).await {
                Ok(image) => {
                    info!(index = slot.index, url = %image.url, "Slot image processed");
                    results.push(Some(image));
                }
                Err(e) => {
                    warn!(index = slot.index, error = %e, "Failed to process slot image");
                    results.push(None);
                }
            }
        }

        results
    }
}
