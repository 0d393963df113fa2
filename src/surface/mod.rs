//! Raster surfaces that frames are painted on and sampled from.
//!
//! The codec only ever paints flat axis-aligned rectangles and reads single
//! pixels, so any pixel buffer can back a frame. [`image::RgbImage`] is the
//! default and the only one that can be persisted.

mod sink;

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::codec::Color;

pub use sink::{
    DirectorySink, FrameSink, MemorySink, clear_frames, frame_file_name, sorted_frame_paths,
};

/// A pixel buffer that tiles can be drawn on and read back from.
pub trait Surface {
    /// Allocate a black surface.
    fn blank(width: u32, height: u32) -> Self
    where
        Self: Sized;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the inclusive rectangle `(x0, y0)..=(x1, y1)`, clipped to the surface.
    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Color);

    /// Color of one pixel. Callers keep `x < width` and `y < height`.
    fn pixel(&self, x: u32, y: u32) -> Color;
}

impl Surface for RgbImage {
    fn blank(width: u32, height: u32) -> Self {
        RgbImage::new(width, height)
    }

    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Color) {
        let (w, h) = self.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let fill = Rgb(color.channels());
        for y in y0..=y1.min(h - 1) {
            for x in x0..=x1.min(w - 1) {
                self.put_pixel(x, y, fill);
            }
        }
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> Color {
        Color::from(self.get_pixel(x, y).0)
    }
}

/// Surface and frame file errors.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load an image file as an RGB surface.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RgbImage, SurfaceError> {
    Ok(image::open(path)?.to_rgb8())
}

/// Write a surface to an image file. The format follows the extension.
pub fn save<P: AsRef<Path>>(surface: &RgbImage, path: P) -> Result<(), SurfaceError> {
    surface.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fill_rect_inclusive() {
        let mut img = RgbImage::blank(10, 10);
        let red = Color::new(200, 0, 0);
        img.fill_rect(2, 3, 4, 5, red);

        assert_eq!(img.pixel(2, 3), red);
        assert_eq!(img.pixel(4, 5), red);
        assert_eq!(img.pixel(5, 5), Color::BLACK);
        assert_eq!(img.pixel(4, 6), Color::BLACK);
    }

    #[test]
    fn test_fill_rect_clipped() {
        let mut img = RgbImage::blank(8, 8);
        let c = Color::new(16, 53, 90);
        img.fill_rect(4, 4, 100, 100, c);
        assert_eq!(img.pixel(7, 7), c);
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("surface.png");

        let mut img = RgbImage::blank(16, 12);
        img.fill_rect(0, 0, 7, 5, Color::WHITE);
        save(&img, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(Surface::width(&loaded), 16);
        assert_eq!(Surface::height(&loaded), 12);
        assert_eq!(loaded.pixel(3, 3), Color::WHITE);
        assert_eq!(loaded.pixel(8, 8), Color::BLACK);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path().join("missing.png")).is_err());
    }
}
