//! # Product Image Pipeline
//!
//! Three stages run one after the other for a single request:
//!
//! 1. [`intake`] buffers the multipart body and rejects non-image or
//!    oversized parts up front.
//! 2. [`slot`] decides which uploaded file belongs to which color slot.
//! 3. [`normalize`] turns each matched file into a bounded JPEG on disk.
//!
//! The result always has one entry per requested slot, in request order.

pub mod intake;
pub mod normalize;
pub mod slot;

use tracing::{debug, instrument};

pub use intake::{MultipartUpload, UploadedFile, collect_multipart};
pub use normalize::{ImageNormalizer, NormalizeError, ProcessedImage};
pub use slot::{SlotFieldPattern, SlotMatch, parse_slot_index, resolve_slots};

/// Outcome for one requested color slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotImage {
    pub index: usize,
    /// `None` when no file matched the slot or processing failed
    pub image: Option<ProcessedImage>,
}

/// Resolves uploaded files to color slots and normalizes them in order.
///
/// `requested` is the explicit index list; `None` derives it from the field
/// names of `files`.
#[instrument(skip_all, fields(files = files.len(), explicit = requested.is_some()))]
pub async fn process_color_images(
    normalizer: &ImageNormalizer,
    files: &[UploadedFile],
    requested: Option<&[usize]>,
) -> Vec<SlotImage> {
    let slots = resolve_slots(files, requested);
    let images = normalizer.normalize_slots(&slots).await;

    let results: Vec<SlotImage> = slots
        .iter()
        .zip(images)
        .map(|(slot, image)| SlotImage {
            index: slot.index,
            image,
        })
        .collect();

    debug!(
        slots = results.len(),
        processed = results.iter().filter(|r| r.image.is_some()).count(),
        "Color images processed"
    );
    results
}
