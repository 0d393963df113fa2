//! Error types for frame encoding and decoding.

use super::palette::Color;
use crate::surface::SurfaceError;

/// Errors raised while reading a frame back from a surface.
///
/// Everything except [`DecodeError::PaletteLookup`] in the body is fatal for
/// the frame. Body lookups can be downgraded with `ignore_errors`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to find header: first tile should be {expected}")]
    HeaderNotFound { expected: Color },
    #[error("Failed to find magic bytes: second tile should be {expected}")]
    MagicBytesNotFound { expected: Color },
    #[error("Header cut off by the frame edge after {read} fields")]
    HeaderTruncated { read: usize },
    #[error("Measured tile width {inferred} disagrees with header value {declared}")]
    TileGeometryMismatch { inferred: u32, declared: u8 },
    #[error("Header declares a zero tile height")]
    InvalidTileHeight,
    #[error("Tile {tile} at ({x}, {y}) has color {color} which matches no palette entry")]
    PaletteLookup {
        tile: usize,
        x: u32,
        y: u32,
        color: Color,
    },
}

/// Errors raised while building frames.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Tile size {width}x{height} is not decodable (allowed 9..=255 pixels)")]
    TileSizeOutOfRange { width: u32, height: u32 },
    #[error("Tiles must be square, got {width}x{height}")]
    NonSquareTile { width: u32, height: u32 },
    #[error("Frame holds {capacity} tiles in {columns} columns, the header needs 13 in at least 2")]
    HeaderDoesNotFit { capacity: usize, columns: u32 },
    #[error("Body length {0} exceeds the 16-bit header field")]
    BodyLengthOverflow(usize),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}
