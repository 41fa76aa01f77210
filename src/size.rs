//! Human-readable file sizes.
//!
//! Sizes are scaled by powers of 1024 but labelled `KB`, `MB`, ... rather
//! than `KiB`, `MiB`, to keep the labels users already grep for.

use thiserror::Error;

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Errors from size formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SizeError {
    /// A byte count below zero.
    #[error("invalid input: byte count cannot be negative (got {0})")]
    Negative(i64),
}

/// Formats a byte count, e.g. `1536` as `"1.5 KB"` and `0` as `"empty"`.
///
/// The value is rounded to two decimals, half away from zero, and printed
/// with at least one decimal digit.
///
/// # Examples
///
/// ```
/// use fsorter::size::format_size;
///
/// assert_eq!(format_size(0), "empty");
/// assert_eq!(format_size(1024), "1.0 KB");
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "empty".to_string();
    }

    let mut unit = 0;
    let mut scale: u128 = 1;
    while unit + 1 < UNITS.len() && u128::from(bytes) >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let scaled = bytes as f64 / scale as f64;
    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{} {}", format_decimal(rounded), UNITS[unit])
}

/// Like [`format_size`], for callers holding a signed count.
///
/// # Errors
///
/// Returns [`SizeError::Negative`] when `bytes < 0`.
pub fn format_signed_size(bytes: i64) -> Result<String, SizeError> {
    u64::try_from(bytes)
        .map(format_size)
        .map_err(|_| SizeError::Negative(bytes))
}

fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
