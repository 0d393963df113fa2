//! Compression-tolerant color matching.
//!
//! Block-based video codecs perturb each channel more or less independently,
//! so matching thresholds every channel on its own (Chebyshev distance)
//! instead of measuring a Euclidean distance.

use super::palette::{CHANNEL_SPACING, Color, NULL_INDEX, Palette};

/// Maximum per-channel drift that still matches a palette entry.
///
/// Half the channel spacing, rounded up, minus one: a sample can never be
/// within tolerance of two entries that are [`CHANNEL_SPACING`] apart.
pub const TOLERANCE: u8 = CHANNEL_SPACING.div_ceil(2) - 1;

/// A sampled color that matched no palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no palette entry within tolerance of color {color}")]
pub struct LookupError {
    pub color: Color,
}

/// True when every channel of `a` and `b` differs by at most [`TOLERANCE`].
#[inline]
pub fn fuzzy_equals(a: Color, b: Color) -> bool {
    fuzzy_equals_within(a, b, TOLERANCE)
}

/// [`fuzzy_equals`] with a caller-chosen tolerance.
#[inline]
pub fn fuzzy_equals_within(a: Color, b: Color, tolerance: u8) -> bool {
    a.r.abs_diff(b.r) <= tolerance
        && a.g.abs_diff(b.g) <= tolerance
        && a.b.abs_diff(b.b) <= tolerance
}

/// Resolve a sampled color to the byte value it most likely encodes.
///
/// Near-black samples short-circuit to [`NULL_INDEX`]. Otherwise the palette is
/// scanned in index order and the first entry within tolerance wins, so two
/// candidates are resolved by palette order rather than by closeness.
pub fn match_color(palette: &Palette, sample: Color) -> Result<u8, LookupError> {
    if sample.channels().iter().all(|&v| v <= TOLERANCE) {
        return Ok(NULL_INDEX);
    }

    palette
        .colors()
        .iter()
        .position(|&entry| fuzzy_equals(entry, sample))
        .map(|index| index as u8)
        .ok_or(LookupError { color: sample })
}
