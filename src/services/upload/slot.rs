//! # Slot Resolver
//!
//! Maps uploaded files to the color slot they belong to.
//!
//! Index list precedence:
//!
//! 1. An explicit list from the caller is used as given, in order.
//! 2. With exactly one requested index and exactly one file, that file fills
//!    the slot whatever its field name.
//! 3. Without an explicit list, indices come from the field names of the
//!    uploaded files, first arrival first.
//!
//! Files whose field name carries no index are dropped silently, and when two
//! files name the same index the earlier one wins.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::intake::UploadedFile;

static FLAT_COUNTER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^colorImage_(\d+)$").expect("Failed to compile flat counter field regex")
});

static ARRAY_PATH_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^colors\[(\d+)\]\[image\]$").expect("Failed to compile array path field regex")
});

/// The field-name shapes that carry a color slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFieldPattern {
    /// `colorImage_<n>`
    FlatCounter,
    /// `colors[<n>][image]`
    ArrayPath,
}

impl SlotFieldPattern {
    pub const ALL: [SlotFieldPattern; 2] = [SlotFieldPattern::FlatCounter, SlotFieldPattern::ArrayPath];

    fn regex(self) -> &'static Regex {
        match self {
            SlotFieldPattern::FlatCounter => &FLAT_COUNTER_FIELD,
            SlotFieldPattern::ArrayPath => &ARRAY_PATH_FIELD,
        }
    }

    /// Extracts the slot index if `field_name` has this shape.
    pub fn parse(self, field_name: &str) -> Option<usize> {
        self.regex()
            .captures(field_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Extracts a slot index from a field name of any accepted shape.
pub fn parse_slot_index(field_name: &str) -> Option<usize> {
    SlotFieldPattern::ALL
        .into_iter()
        .find_map(|pattern| pattern.parse(field_name))
}

/// A requested slot and the file chosen for it, if any.
#[derive(Debug, Clone, Copy)]
pub struct SlotMatch<'a> {
    pub index: usize,
    pub file: Option<&'a UploadedFile>,
}

/// Derives slot indices from field names, de-duplicated in arrival order.
pub fn derive_slot_indices(files: &[UploadedFile]) -> Vec<usize> {
    let mut indices = Vec::new();
    for file in files {
        match parse_slot_index(&file.field_name) {
            Some(index) if !indices.contains(&index) => indices.push(index),
            Some(index) => {
                debug!(index, field_name = %file.field_name, "Ignoring duplicate upload for slot");
            }
            None => {
                debug!(field_name = %file.field_name, "Dropping upload with unrecognized field name");
            }
        }
    }
    indices
}

/// Pairs every requested slot with the file that fills it.
///
/// The result has one entry per requested index (explicit or derived), in the
/// same order, whether or not a file was found.
pub fn resolve_slots<'a>(files: &'a [UploadedFile], requested: Option<&[usize]>) -> Vec<SlotMatch<'a>> {
    let indices = match requested {
        Some(indices) => indices.to_vec(),
        None => derive_slot_indices(files),
    };

    let single_file_shortcut = indices.len() == 1 && files.len() == 1;
    if single_file_shortcut {
        trace!("Single slot with single file, matching unconditionally");
    }

    indices
        .into_iter()
        .map(|index| {
            let file = if single_file_shortcut {
                files.first()
            } else {
                files
                    .iter()
                    .find(|f| parse_slot_index(&f.field_name) == Some(index))
            };
            SlotMatch { index, file }
        })
        .collect()
}
