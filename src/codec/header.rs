//! Fixed 13-tile frame header.
//!
//! ```text
//! tile 0:      magic, palette[0x00] (black)
//! tile 1:      magic, palette[0xFF] (white)
//! tile 2:      version
//! tiles 3-4:   reserved (0)
//! tile 5:      frame sequence number
//! tile 6:      tile width in pixels
//! tile 7:      tile height in pixels
//! tiles 8-9:   body length in tiles (big-endian u16)
//! tiles 10-12: reserved (0)
//! ```

use super::palette::{NULL_INDEX, WHITE_INDEX};

/// Number of tiles occupied by the header.
pub const HEADER_TILES: usize = 13;

/// Current frame format version.
pub const FRAME_VERSION: u8 = 1;

/// Header fields carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    /// Position of the frame in its stream, wrapping at 256.
    pub sequence: u8,
    pub tile_width: u8,
    pub tile_height: u8,
    /// Number of payload tiles following the header.
    pub body_length: u16,
}

impl FrameHeader {
    pub fn new(sequence: u8, tile_width: u8, tile_height: u8, body_length: u16) -> Self {
        Self {
            version: FRAME_VERSION,
            sequence,
            tile_width,
            tile_height,
            body_length,
        }
    }

    /// Byte values of all header tiles, magic included.
    pub fn to_tiles(&self) -> [u8; HEADER_TILES] {
        let [len_hi, len_lo] = self.body_length.to_be_bytes();
        [
            NULL_INDEX,
            WHITE_INDEX,
            self.version,
            0,
            0,
            self.sequence,
            self.tile_width,
            self.tile_height,
            len_hi,
            len_lo,
            0,
            0,
            0,
        ]
    }

    /// Parse the eleven tiles that follow the two magic tiles.
    ///
    /// Reserved tiles are ignored.
    pub fn from_fields(fields: &[u8; HEADER_TILES - 2]) -> Self {
        Self {
            version: fields[0],
            sequence: fields[3],
            tile_width: fields[4],
            tile_height: fields[5],
            body_length: u16::from_be_bytes([fields[6], fields[7]]),
        }
    }
}
