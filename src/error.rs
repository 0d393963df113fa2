//! Crate-level error type.

use crate::codec::{DecodeError, EncodeError};
use crate::schema::ConfigError;
use crate::surface::SurfaceError;
use crate::video::VideoError;

/// Any failure from the encode/decode pipelines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("Video transcoding failed: {0}")]
    Video(#[from] VideoError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid hex needle: {0}")]
    Needle(#[from] hex::FromHexError),
    #[error("No frames found in {0}")]
    NoFrames(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_not_io() {
        let err: Error = serde_json::from_str::<crate::schema::CodecConfig>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("Invalid configuration file"));
    }

    #[test]
    fn test_hex_needle_error() {
        let err: Error = hex::decode("abc").unwrap_err().into();
        assert!(matches!(err, Error::Needle(_)));
    }
}
