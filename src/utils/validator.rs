//! # Text Input Validation Utilities
//!
//! Validation helpers for catalog input: color hex codes, garment sizes and
//! the loosely typed boolean/number fields that arrive as multipart text.

use std::sync::LazyLock;

use regex::Regex;

/// Hex color code regex pattern
///
/// Accepts `#rgb` and `#rrggbb` forms, case-insensitive.
///
/// # Examples
///
/// - `#000000` ✓ Valid
/// - `#fFf` ✓ Valid
/// - `000000` ✗ Invalid (missing `#`)
/// - `#12345` ✗ Invalid length
pub static HEX_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("Failed to compile hex color regex")
});

/// Garment sizes a product may list.
pub const ALLOWED_SIZES: [&str; 5] = ["XS", "S", "M", "L", "XL"];

/// Validates that a size is one of [`ALLOWED_SIZES`].
///
/// # Examples
///
/// - `validate_size("M")` ✓ Valid
/// - `validate_size("XXL")` ✗ Invalid
pub fn validate_size(size: &str) -> Result<(), String> {
    if ALLOWED_SIZES.contains(&size) {
        Ok(())
    } else {
        Err(format!(
            "Invalid size '{size}'. Allowed sizes: {}",
            ALLOWED_SIZES.join(", ")
        ))
    }
}

/// Interprets a multipart text flag. Only the literal `true` counts as set.
#[inline]
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}
