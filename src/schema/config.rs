//! Configuration types for encoding, decoding and video transcoding.

use serde::{Deserialize, Serialize};

use crate::codec::{HEADER_TILES, MAX_TILE_SIZE, MIN_DECODABLE_TILE_SIZE, MIN_TILE_SIZE};

/// Pixel resolution of every frame in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of whole tiles of the given size that fit on the frame.
    #[inline]
    pub fn tile_capacity(&self, tile_width: u32, tile_height: u32) -> usize {
        if tile_width == 0 || tile_height == 0 {
            return 0;
        }
        (self.width / tile_width) as usize * (self.height / tile_height) as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

fn default_prefix() -> String {
    "frame".to_string()
}

fn default_extension() -> String {
    "png".to_string()
}

/// Top-level codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Resolution of each encoded frame.
    pub resolution: Resolution,
    /// Square tile edge in pixels. `None` lets the planner choose.
    #[serde(default)]
    pub tile_size: Option<u32>,
    /// Substitute zero for tiles that match no palette entry instead of failing.
    #[serde(default)]
    pub ignore_errors: bool,
    /// File name prefix for persisted frames (`prefix_NNN.ext`).
    #[serde(default = "default_prefix")]
    pub frame_prefix: String,
    /// File extension for persisted frames. Must be lossless.
    #[serde(default = "default_extension")]
    pub frame_extension: String,
    /// Video transcoder parameters.
    #[serde(default)]
    pub video: VideoConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            tile_size: None,
            ignore_errors: false,
            frame_prefix: default_prefix(),
            frame_extension: default_extension(),
            video: VideoConfig::default(),
        }
    }
}

/// Parameters handed to the external `ffmpeg` transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Path or name of the ffmpeg binary.
    pub ffmpeg: String,
    /// Output frame rate.
    pub framerate: u32,
    /// Video codec name.
    pub codec: String,
    /// Target bitrate (ffmpeg notation, e.g. `200k`).
    pub bitrate: String,
    /// Constant rate factor.
    pub crf: u32,
    /// Extra codec parameters (`-x264-params`). Empty to omit.
    pub codec_params: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            framerate: 20,
            codec: "libx264".to_string(),
            bitrate: "200k".to_string(),
            crf: 28,
            codec_params: "keyint=1:scenecut=0".to_string(),
        }
    }
}

impl CodecConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidResolution);
        }
        if let Some(size) = self.tile_size {
            if !(MIN_DECODABLE_TILE_SIZE..=MAX_TILE_SIZE).contains(&size) {
                return Err(ConfigError::TileSizeOutOfRange(size));
            }
            if width / size < 2 || self.resolution.tile_capacity(size, size) < HEADER_TILES {
                return Err(ConfigError::HeaderDoesNotFit { tile_size: size });
            }
        } else if self.resolution.tile_capacity(MIN_TILE_SIZE, MIN_TILE_SIZE) < HEADER_TILES {
            return Err(ConfigError::InvalidResolution);
        }
        if self.frame_prefix.is_empty() || self.frame_extension.is_empty() {
            return Err(ConfigError::InvalidFrameNaming);
        }
        if self.video.framerate == 0 {
            return Err(ConfigError::InvalidFramerate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Resolution is too small to hold a frame header")]
    InvalidResolution,
    #[error("Tile size {0} is outside 9..=255")]
    TileSizeOutOfRange(u32),
    #[error("Header does not fit a frame with {tile_size}px tiles")]
    HeaderDoesNotFit { tile_size: u32 },
    #[error("Frame prefix and extension must be non-empty")]
    InvalidFrameNaming,
    #[error("Frame rate must be non-zero")]
    InvalidFramerate,
}
