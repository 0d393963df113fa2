//! Single-frame codec.
//!
//! A frame is written through [`FrameWriter`] and read back with
//! [`decode_frame`]. The two never share state: a decoder recovers the tile
//! geometry from the pixels alone.

use image::RgbImage;
use log::{debug, warn};

use super::cursor::{CursorState, TileGrid};
use super::error::{DecodeError, EncodeError};
use super::fuzzy::{fuzzy_equals, match_color};
use super::header::{FrameHeader, HEADER_TILES};
use super::palette::{Color, Palette};
use super::planner::{MAX_TILE_SIZE, MIN_DECODABLE_TILE_SIZE};
use crate::schema::Resolution;
use crate::surface::Surface;

/// Pixel inset from the top-left corner used to probe the first header tile.
pub const HEADER_PROBE_INSET: u32 = 8;

/// A frame being painted tile by tile.
///
/// The header is drawn on construction. Body tiles follow in raster order
/// until either the surface or the declared body length is exhausted.
pub struct FrameWriter<S: Surface = RgbImage> {
    header: FrameHeader,
    grid: TileGrid,
    cursor: CursorState,
    body_written: usize,
    surface: S,
}

impl<S: Surface> FrameWriter<S> {
    /// Allocate a blank surface and draw the header.
    pub fn new(
        sequence: u8,
        body_length: usize,
        resolution: Resolution,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, EncodeError> {
        let valid = MIN_DECODABLE_TILE_SIZE..=MAX_TILE_SIZE;
        if !valid.contains(&tile_width) || !valid.contains(&tile_height) {
            return Err(EncodeError::TileSizeOutOfRange {
                width: tile_width,
                height: tile_height,
            });
        }
        if tile_width != tile_height {
            return Err(EncodeError::NonSquareTile {
                width: tile_width,
                height: tile_height,
            });
        }

        let grid = TileGrid::new(resolution.width, resolution.height, tile_width, tile_height);
        if grid.capacity() < HEADER_TILES || grid.columns() < 2 {
            return Err(EncodeError::HeaderDoesNotFit {
                capacity: grid.capacity(),
                columns: grid.columns(),
            });
        }

        let body_length =
            u16::try_from(body_length).map_err(|_| EncodeError::BodyLengthOverflow(body_length))?;
        let header = FrameHeader::new(sequence, tile_width as u8, tile_height as u8, body_length);

        let mut frame = Self {
            header,
            grid,
            cursor: grid.start(),
            body_written: 0,
            surface: S::blank(resolution.width, resolution.height),
        };
        for byte in header.to_tiles() {
            frame.draw(byte);
        }

        Ok(frame)
    }

    /// Draw one byte as a tile. Returns the number of tiles drawn (0 or 1).
    ///
    /// A return of 0 means the frame is full and the byte belongs on the next
    /// frame.
    pub fn write(&mut self, byte: u8) -> usize {
        if self.is_full() {
            return 0;
        }
        let drawn = self.draw(byte);
        self.body_written += drawn;
        drawn
    }

    /// Draw bytes until the frame fills. Returns how many were drawn.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let mut drawn = 0;
        for &byte in bytes {
            if self.write(byte) == 0 {
                break;
            }
            drawn += 1;
        }
        drawn
    }

    fn draw(&mut self, byte: u8) -> usize {
        let Some((x, y)) = self.grid.position(self.cursor) else {
            return 0;
        };
        let color = Palette::global().color(byte);
        self.surface.fill_rect(
            x,
            y,
            x + self.grid.tile_width - 1,
            y + self.grid.tile_height - 1,
            color,
        );
        self.cursor = self.grid.advance(self.cursor);
        1
    }

    /// True once no more body tiles may be written.
    pub fn is_full(&self) -> bool {
        self.cursor == CursorState::Full || self.body_written >= self.header.body_length as usize
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// Number of body tiles drawn so far.
    pub fn body_written(&self) -> usize {
        self.body_written
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Finish the frame and hand over its surface.
    pub fn into_surface(self) -> S {
        self.surface
    }
}

/// A body tile that matched no palette entry and was replaced by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAnomaly {
    /// Body tile index.
    pub tile: usize,
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

/// Result of decoding one frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub body: Vec<u8>,
    /// Tiles substituted with zero in `ignore_errors` mode.
    pub anomalies: Vec<TileAnomaly>,
}

impl DecodedFrame {
    /// True when fewer tiles were read than the header declared.
    pub fn is_truncated(&self) -> bool {
        self.body.len() < self.header.body_length as usize
    }
}

/// Walks tile centers in raster order.
///
/// Before each sample the cursor wraps to the next row when less than half a
/// tile of horizontal space remains, and stops when less than half a tile of
/// vertical space remains.
struct SampleCursor {
    x: u32,
    y: u32,
    tile_width: u32,
    tile_height: u32,
    width: u32,
    height: u32,
}

impl SampleCursor {
    fn next_sample(&mut self) -> Option<(u32, u32)> {
        let half_width = self.tile_width.div_ceil(2);
        let half_height = self.tile_height.div_ceil(2);

        if self.width.saturating_sub(self.x) < half_width {
            self.x = half_width;
            self.y += self.tile_height;
        }
        if self.height.saturating_sub(self.y) < half_height || self.x >= self.width {
            return None;
        }

        let position = (self.x, self.y);
        self.x += self.tile_width;
        Some(position)
    }
}

/// Find the black magic tile and measure its width.
///
/// Tiles are square, so the width is also the tile height used to locate the
/// rest of the header.
pub fn probe_tile_size<S: Surface + ?Sized>(surface: &S) -> Result<u32, DecodeError> {
    let palette = Palette::global();
    let (width, height) = (surface.width(), surface.height());
    let inset = HEADER_PROBE_INSET;

    if width <= inset
        || height <= inset
        || !fuzzy_equals(surface.pixel(inset, inset), palette.null())
    {
        return Err(DecodeError::HeaderNotFound {
            expected: palette.null(),
        });
    }

    let mut x = inset;
    while x < width {
        if fuzzy_equals(surface.pixel(x, inset), palette.white()) {
            return Ok(x);
        }
        x += 1;
    }

    Err(DecodeError::MagicBytesNotFound {
        expected: palette.white(),
    })
}

/// Decode one frame from a surface.
///
/// With `ignore_errors`, body tiles that match no palette entry decode as zero
/// and are reported in [`DecodedFrame::anomalies`]. Header failures are always
/// fatal.
pub fn decode_frame<S: Surface + ?Sized>(
    surface: &S,
    ignore_errors: bool,
) -> Result<DecodedFrame, DecodeError> {
    let palette = Palette::global();
    let tile_size = probe_tile_size(surface)?;

    // Resume at the center of the third tile, after the two magic tiles.
    let mut cursor = SampleCursor {
        x: (tile_size * 5).div_ceil(2),
        y: tile_size.div_ceil(2),
        tile_width: tile_size,
        tile_height: tile_size,
        width: surface.width(),
        height: surface.height(),
    };

    let mut fields = [0u8; HEADER_TILES - 2];
    for (read, field) in fields.iter_mut().enumerate() {
        let (x, y) = cursor
            .next_sample()
            .ok_or(DecodeError::HeaderTruncated { read })?;
        let color = surface.pixel(x, y);
        *field = match_color(palette, color).map_err(|_| DecodeError::PaletteLookup {
            tile: read,
            x,
            y,
            color,
        })?;
    }

    let header = FrameHeader::from_fields(&fields);
    if header.tile_width as u32 != tile_size {
        return Err(DecodeError::TileGeometryMismatch {
            inferred: tile_size,
            declared: header.tile_width,
        });
    }
    if header.tile_height == 0 {
        return Err(DecodeError::InvalidTileHeight);
    }
    cursor.tile_height = header.tile_height as u32;

    debug!(
        "Frame {} v{}: {}x{} tiles, {} body tiles",
        header.sequence, header.version, header.tile_width, header.tile_height, header.body_length
    );

    let mut body = Vec::with_capacity(header.body_length as usize);
    let mut anomalies = Vec::new();
    for tile in 0..header.body_length as usize {
        let Some((x, y)) = cursor.next_sample() else {
            warn!(
                "Frame {}: ran out of surface after {} of {} tiles",
                header.sequence, tile, header.body_length
            );
            break;
        };

        let color = surface.pixel(x, y);
        match match_color(palette, color) {
            Ok(byte) => body.push(byte),
            Err(_) if ignore_errors => {
                warn!("Invalid tile {tile} at ({x},{y}) {color}, ignoring");
                anomalies.push(TileAnomaly { tile, x, y, color });
                body.push(0);
            }
            Err(_) => return Err(DecodeError::PaletteLookup { tile, x, y, color }),
        }
    }

    Ok(DecodedFrame {
        header,
        body,
        anomalies,
    })
}

/// Center color of every whole tile in raster order.
pub fn sample_tiles<S: Surface + ?Sized>(surface: &S, tile_width: u32, tile_height: u32) -> Vec<Color> {
    let grid = TileGrid::new(surface.width(), surface.height(), tile_width, tile_height);
    let mut colors = Vec::with_capacity(grid.capacity());
    for row in 0..grid.rows() {
        for col in 0..grid.columns() {
            colors.push(surface.pixel(
                col * tile_width + tile_width / 2,
                row * tile_height + tile_height / 2,
            ));
        }
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res() -> Resolution {
        Resolution::new(1280, 720)
    }

    #[test]
    fn test_header_drawn_on_creation() {
        let frame: FrameWriter = FrameWriter::new(0, 3, res(), 160, 160).unwrap();
        let palette = Palette::global();

        let tiles = sample_tiles(frame.surface(), 160, 160);
        let expected = FrameHeader::new(0, 160, 160, 3).to_tiles();
        for (i, &byte) in expected.iter().enumerate() {
            assert_eq!(tiles[i], palette.color(byte), "header tile {i}");
        }
        // 8 columns: the body starts at row 1, column 5
        assert_eq!(frame.cursor(), CursorState::Writing { x: 800, y: 160 });
    }

    #[test]
    fn test_single_byte_roundtrip_header() {
        let mut frame: FrameWriter = FrameWriter::new(0, 1, res(), 160, 160).unwrap();
        assert_eq!(frame.write(0xAB), 1);

        let decoded = decode_frame(frame.surface(), false).unwrap();
        assert_eq!(decoded.header.version, 1);
        assert_eq!(decoded.header.sequence, 0);
        assert_eq!(decoded.header.tile_width, 160);
        assert_eq!(decoded.header.tile_height, 160);
        assert_eq!(decoded.header.body_length, 1);
        assert_eq!(decoded.body, vec![0xAB]);
        assert!(decoded.anomalies.is_empty());
    }

    #[test]
    fn test_write_stops_at_body_length() {
        let mut frame: FrameWriter = FrameWriter::new(4, 3, res(), 160, 160).unwrap();
        assert_eq!(frame.header(), &FrameHeader::new(4, 160, 160, 3));
        assert_eq!(frame.body_written(), 0);
        assert_eq!(frame.write_bytes(b"Hi!there"), 3);
        assert_eq!(frame.body_written(), 3);
        assert!(frame.is_full());
        assert_eq!(frame.write(b'x'), 0);

        let decoded = decode_frame(frame.surface(), false).unwrap();
        assert_eq!(decoded.body, b"Hi!");
        assert_eq!(decoded.header.sequence, 4);
    }

    #[test]
    fn test_write_stops_when_surface_full() {
        // 8 x 4 tiles = 32, 19 left after the header
        let mut frame: FrameWriter = FrameWriter::new(0, 1000, res(), 160, 160).unwrap();
        let data: Vec<u8> = (0..40).collect();
        assert_eq!(frame.write_bytes(&data), 19);
        assert_eq!(frame.cursor(), CursorState::Full);
        assert_eq!(frame.write(1), 0);
    }

    #[test]
    fn test_every_byte_value_roundtrips() {
        let data: Vec<u8> = (0..=255).collect();
        let mut frame: FrameWriter = FrameWriter::new(9, data.len(), res(), 32, 32).unwrap();
        assert_eq!(frame.write_bytes(&data), 256);

        let decoded = decode_frame(frame.surface(), false).unwrap();
        assert_eq!(decoded.body, data);
    }

    #[test]
    fn test_odd_tile_size_roundtrip() {
        let data = b"odd sized tiles sample off-center pixels";
        let mut frame: FrameWriter =
            FrameWriter::new(1, data.len(), Resolution::new(333, 211), 21, 21).unwrap();
        assert_eq!(frame.write_bytes(data), data.len());

        let decoded = decode_frame(frame.surface(), false).unwrap();
        assert_eq!(decoded.body, data);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(matches!(
            FrameWriter::<RgbImage>::new(0, 1, res(), 8, 8),
            Err(EncodeError::TileSizeOutOfRange { .. })
        ));
        assert!(matches!(
            FrameWriter::<RgbImage>::new(0, 1, Resolution::new(200, 200), 64, 64),
            Err(EncodeError::HeaderDoesNotFit { .. })
        ));
        assert!(matches!(
            FrameWriter::<RgbImage>::new(0, 70_000, res(), 32, 32),
            Err(EncodeError::BodyLengthOverflow(70_000))
        ));
    }

    #[test]
    fn test_rejects_non_square_tiles() {
        assert!(matches!(
            FrameWriter::<RgbImage>::new(0, 5, res(), 64, 16),
            Err(EncodeError::NonSquareTile {
                width: 64,
                height: 16
            })
        ));
    }

    #[test]
    fn test_header_cut_off_by_frame_edge() {
        // 9 columns: header tiles 9..13 spill onto the second row
        let frame: FrameWriter = FrameWriter::new(0, 0, Resolution::new(288, 64), 32, 32).unwrap();
        let img = frame.into_surface();
        let cropped = image::imageops::crop_imm(&img, 0, 0, 288, 32).to_image();

        assert!(matches!(
            decode_frame(&cropped, false),
            Err(DecodeError::HeaderTruncated { read: 7 })
        ));
    }

    #[test]
    fn test_zero_tile_height_rejected() {
        let frame: FrameWriter = FrameWriter::new(0, 3, res(), 160, 160).unwrap();
        let mut img = frame.into_surface();
        // Header tile 7 holds the tile height.
        img.fill_rect(1120, 0, 1279, 159, Palette::global().color(0));

        assert!(matches!(
            decode_frame(&img, false),
            Err(DecodeError::InvalidTileHeight)
        ));
    }

    #[test]
    fn test_blank_surface_has_no_magic() {
        let img = RgbImage::blank(64, 64);
        assert!(matches!(
            decode_frame(&img, false),
            Err(DecodeError::MagicBytesNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_header() {
        let mut img = RgbImage::blank(64, 64);
        img.fill_rect(0, 0, 63, 63, Color::new(200, 16, 16));
        assert!(matches!(
            decode_frame(&img, false),
            Err(DecodeError::HeaderNotFound { .. })
        ));

        let tiny = RgbImage::blank(8, 8);
        assert!(matches!(
            decode_frame(&tiny, false),
            Err(DecodeError::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn test_tile_geometry_mismatch() {
        let frame: FrameWriter = FrameWriter::new(0, 0, res(), 40, 40).unwrap();
        let mut img = frame.into_surface();
        // Widen the black magic tile so the measured width disagrees.
        img.fill_rect(40, 0, 47, 39, Color::BLACK);
        assert!(matches!(
            decode_frame(&img, false),
            Err(DecodeError::TileGeometryMismatch {
                inferred: 48,
                declared: 40
            })
        ));
    }

    #[test]
    fn test_ignore_errors_substitutes_zero() {
        let data = b"abcdef";
        let mut frame: FrameWriter = FrameWriter::new(0, data.len(), res(), 160, 160).unwrap();
        frame.write_bytes(data);
        let mut img = frame.into_surface();

        // Body tile 2 sits at column 7 of row 1; paint it with a color no
        // palette entry is near.
        img.fill_rect(1120, 160, 1279, 319, Color::new(255, 0, 255));

        let err = decode_frame(&img, false).unwrap_err();
        assert!(matches!(err, DecodeError::PaletteLookup { tile: 2, .. }));

        let decoded = decode_frame(&img, true).unwrap();
        assert_eq!(decoded.body, b"ab\0def");
        assert_eq!(decoded.anomalies.len(), 1);
        assert_eq!(decoded.anomalies[0].tile, 2);
        assert_eq!(decoded.anomalies[0].color, Color::new(255, 0, 255));
    }

    #[test]
    fn test_decode_tolerates_uniform_drift() {
        let data = b"drift";
        let mut frame: FrameWriter = FrameWriter::new(0, data.len(), res(), 64, 64).unwrap();
        frame.write_bytes(data);
        let mut img = frame.into_surface();

        for pixel in img.pixels_mut() {
            let c = Color::from(pixel.0).offset(12, -9, 15);
            pixel.0 = c.channels();
        }

        let decoded = decode_frame(&img, false).unwrap();
        assert_eq!(decoded.body, data);
    }

    #[test]
    fn test_truncated_body_is_partial() {
        let mut frame: FrameWriter = FrameWriter::new(0, 19, res(), 160, 160).unwrap();
        frame.write_bytes(&[7; 19]);
        let img = frame.into_surface();

        // Crop away the last tile row.
        let cropped = image::imageops::crop_imm(&img, 0, 0, 1280, 480).to_image();
        let decoded = decode_frame(&cropped, false).unwrap();
        assert!(decoded.is_truncated());
        assert_eq!(decoded.body, vec![7; 11]);
    }

    #[test]
    fn test_sample_tiles_count() {
        let img = RgbImage::blank(100, 50);
        assert_eq!(sample_tiles(&img, 20, 20).len(), 5 * 2);
    }
}
