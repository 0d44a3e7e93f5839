//! # Upload Utilities
//!
//! This module provides the low-level pieces of product image handling: content
//! validation, filesystem placement and the decode/resize/encode primitives.
//! The upload pipeline in [`crate::services::upload`] composes them.

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::{
    DynamicImage, GenericImageView, ImageResult, codecs::jpeg::JpegEncoder, imageops::FilterType,
};
use rand::Rng;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, trace};

use crate::utils::constant::{MAX_UPLOAD_FILE_SIZE, UPLOAD_URL_PREFIX};

/// Provides image validation utilities for upload handlers.
pub struct ImageUploadValidator;

impl ImageUploadValidator {
    /// Validates that the content type is an image type.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Content type is valid (starts with "image/")
    /// * `Err(String)` - Content type is invalid with error message
    pub fn validate_content_type(content_type: &str) -> Result<(), String> {
        if !content_type.starts_with("image/") {
            return Err(format!(
                "Only image files are allowed (image/* content type required), got: {content_type}"
            ));
        }
        Ok(())
    }

    /// Validates that a part has not grown past [`MAX_UPLOAD_FILE_SIZE`].
    pub fn validate_file_size(size: usize) -> Result<(), &'static str> {
        if size > MAX_UPLOAD_FILE_SIZE {
            return Err("File too large (5 MiB per image)");
        }
        Ok(())
    }
}

/// Provides file system utilities for upload handlers.
pub struct FileManager;

impl FileManager {
    /// Ensures the specified directory exists, creating it if necessary.
    pub async fn ensure_directory_exists(path: &Path) -> Result<(), std::io::Error> {
        trace!(path = %path.display(), "Ensuring directory exists");
        fs::create_dir_all(path).await
    }

    /// Generates the filename of a processed product image.
    ///
    /// The original base name is kept (non-alphanumerics replaced with `_`) and
    /// suffixed with a nanosecond timestamp plus a random number, so two
    /// requests uploading `shirt.png` at the same moment still get distinct
    /// names without any shared state.
    ///
    /// # Returns
    ///
    /// A filename in the format `processed-{stem}-{nanos}-{random}.jpg`
    pub fn generate_processed_filename(original_name: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        format!(
            "processed-{}-{nanos}-{suffix:09}.jpg",
            Self::sanitize_stem(original_name)
        )
    }

    /// Reduces a client filename to a safe stem: base name only, without the
    /// extension, ASCII alphanumerics kept and everything else replaced by `_`.
    pub fn sanitize_stem(original_name: &str) -> String {
        // Clients on Windows send backslash separated paths
        let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
        let stem = Path::new(base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let sanitized: String = stem
            .chars()
            .take(64)
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        if sanitized.is_empty() {
            "image".to_string()
        } else {
            sanitized
        }
    }

    /// Writes `data` to a file that must not exist yet.
    ///
    /// Fails with [`std::io::ErrorKind::AlreadyExists`] instead of overwriting.
    pub async fn save_new_file(file_path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
        debug!(file_path = %file_path.display(), size = data.len(), "Saving file");

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(file_path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        debug!(file_path = %file_path.display(), "File saved successfully");
        Ok(())
    }

    /// Reads the size of a file back from disk.
    pub async fn file_size(file_path: &Path) -> Result<u64, std::io::Error> {
        Ok(fs::metadata(file_path).await?.len())
    }

    /// Attempts to remove a file, logging instead of returning errors.
    ///
    /// A file that is already gone is not an error.
    pub async fn cleanup_file(file_path: &Path) {
        match fs::remove_file(file_path).await {
            Ok(()) => debug!(file_path = %file_path.display(), "File cleaned up successfully"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(file_path = %file_path.display(), "File already absent");
            }
            Err(e) => error!(
                file_path = %file_path.display(),
                error = %e,
                "Failed to clean up file"
            ),
        }
    }

    /// Maps a stored public URL back to its location under `upload_dir`.
    ///
    /// Absolute `http(s)://` URLs are reduced to their path first. Anything
    /// outside [`UPLOAD_URL_PREFIX`], or containing `..` or other non-normal
    /// segments, yields `None`.
    pub fn path_from_public_url(upload_dir: &Path, url: &str) -> Option<PathBuf> {
        let pathname = if url.starts_with("http://") || url.starts_with("https://") {
            reqwest::Url::parse(url).ok()?.path().to_string()
        } else {
            url.to_string()
        };

        let relative = pathname.strip_prefix(UPLOAD_URL_PREFIX)?.strip_prefix('/')?;
        let relative = Path::new(relative);

        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        Some(upload_dir.join(relative))
    }
}

/// Provides the decode, resize and encode steps of image normalization.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Computes the size of an image scaled to fit a `max × max` box.
    ///
    /// The larger dimension becomes `max` and the other one is scaled
    /// proportionally. Images already inside the box keep their size.
    pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
        if width <= max && height <= max {
            return (width, height);
        }

        if width >= height {
            let ratio = height as f64 / width as f64;
            (max, ((max as f64 * ratio).round() as u32).max(1))
        } else {
            let ratio = width as f64 / height as f64;
            (((max as f64 * ratio).round() as u32).max(1), max)
        }
    }

    /// Decodes an in-memory image, detecting its format from the content.
    pub fn decode(data: &[u8]) -> ImageResult<DynamicImage> {
        let img = image::load_from_memory(data)?;
        trace!(
            width = img.width(),
            height = img.height(),
            "Image decoded"
        );
        Ok(img)
    }

    /// Scales an image down into a `max × max` box; never enlarges it.
    pub fn resize_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (new_width, new_height) = Self::fit_within(width, height, max);

        if (new_width, new_height) == (width, height) {
            debug!(width, height, max, "Image already inside bounding box, keeping size");
            return img;
        }

        debug!(
            width,
            height, new_width, new_height, "Resizing to bounding box"
        );
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    }

    /// Encodes an image as baseline JPEG at the given quality.
    ///
    /// Alpha is dropped since JPEG has no transparency.
    pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        let rgb = img.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;

        trace!(encoded_size = buffer.len(), quality, "Image encoded as JPEG");
        Ok(buffer)
    }
}
