//! File-level pipelines: payload to frame files to video, and back.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;

use crate::codec::{
    Color, DecodedFrame, StreamEncoder, decode_frame, decode_frames, fuzzy_equals_within,
    join_frames, sample_tiles,
};
use crate::error::{Error, Result};
use crate::schema::CodecConfig;
use crate::surface::{self, DirectorySink, clear_frames, sorted_frame_paths};
use crate::video::Transcoder;

/// Name prefix of the scratch directory video frames are extracted into.
const EXTRACT_PREFIX: &str = "tilesteg-extract-";

fn encoder_for(config: &CodecConfig) -> StreamEncoder {
    let encoder = StreamEncoder::new(config.resolution);
    match config.tile_size {
        Some(size) => encoder.with_tile_size(size),
        None => encoder,
    }
}

/// Encode a payload to numbered frame images in `out_dir`.
///
/// Frames of an earlier stream with the same naming are replaced.
pub fn encode_to_frames(payload: &[u8], out_dir: &Path, config: &CodecConfig) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let mut sink = DirectorySink::new(out_dir, &config.frame_prefix, &config.frame_extension)?;
    Ok(encoder_for(config).encode(payload, &mut sink)?)
}

/// Encode a payload to frame images and pack them into `video`.
pub fn encode_to_video(
    payload: &[u8],
    out_dir: &Path,
    video: &Path,
    config: &CodecConfig,
) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let mut sink = DirectorySink::new(out_dir, &config.frame_prefix, &config.frame_extension)?;
    let frames = encoder_for(config).encode(payload, &mut sink)?;
    Transcoder::new(config.video.clone()).images_to_video(&sink.pattern(), video)?;
    Ok(frames)
}

/// Load frame images in parallel, keeping their order.
pub fn load_frames(paths: &[PathBuf]) -> Result<Vec<RgbImage>> {
    Ok(paths
        .par_iter()
        .map(surface::load)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Decode frame image files in the given order and join their bodies.
pub fn decode_files(paths: &[PathBuf], ignore_errors: bool) -> Result<Vec<u8>> {
    let frames = load_frames(paths)?;
    let decoded = decode_frames(&frames, ignore_errors)?;
    report_anomalies(paths, &decoded);
    Ok(join_frames(&decoded))
}

/// Decode every frame image in `dir`, ordered by the number in its file name.
pub fn decode_directory(dir: &Path, extension: &str, ignore_errors: bool) -> Result<Vec<u8>> {
    let paths = sorted_frame_paths(dir, extension)?;
    if paths.is_empty() {
        return Err(Error::NoFrames(dir.display().to_string()));
    }
    decode_files(&paths, ignore_errors)
}

/// Extract the frames of `video` into `workdir` and return their paths in order.
///
/// Frames already in `workdir` with the same naming are removed first.
pub fn extract_frames(video: &Path, workdir: &Path, config: &CodecConfig) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(workdir)?;
    clear_frames(workdir, &config.frame_prefix, &config.frame_extension)?;
    let pattern = workdir.join(format!(
        "{}_%03d.{}",
        config.frame_prefix, config.frame_extension
    ));
    Transcoder::new(config.video.clone()).video_to_images(video, &pattern)?;
    Ok(sorted_frame_paths(workdir, &config.frame_extension)?)
}

/// Unpack a video and decode the payload carried by its frames.
///
/// Frames are extracted into a new directory under `workdir`, which is
/// removed afterwards unless `keep_images` is set. Nothing else in `workdir`
/// is touched.
pub fn decode_video(
    video: &Path,
    workdir: &Path,
    config: &CodecConfig,
    keep_images: bool,
) -> Result<Vec<u8>> {
    fs::create_dir_all(workdir)?;
    let extract_dir = tempfile::Builder::new()
        .prefix(EXTRACT_PREFIX)
        .tempdir_in(workdir)?;

    let paths = extract_frames(video, extract_dir.path(), config)?;
    if paths.is_empty() {
        return Err(Error::NoFrames(video.display().to_string()));
    }
    info!("Decoding {} frames from {}", paths.len(), video.display());

    let result = decode_files(&paths, config.ignore_errors);
    if keep_images {
        let kept = extract_dir.keep();
        info!("Kept extracted frames in {}", kept.display());
    }
    result
}

fn report_anomalies(paths: &[PathBuf], frames: &[DecodedFrame]) {
    for (path, frame) in paths.iter().zip(frames) {
        if !frame.anomalies.is_empty() {
            warn!(
                "{}: {} tile(s) substituted with zero",
                path.display(),
                frame.anomalies.len()
            );
        }
    }
}

/// A needle occurrence inside one frame's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedleHit {
    pub path: PathBuf,
    /// Byte offset within the frame body.
    pub index: usize,
}

/// Search each frame's decoded body for `needle`, reporting the first hit per frame.
pub fn find_in_frames(paths: &[PathBuf], needle: &[u8], ignore_errors: bool) -> Result<Vec<NeedleHit>> {
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let hits = paths
        .par_iter()
        .map(|path| -> Result<Option<NeedleHit>> {
            let frame = decode_frame(&surface::load(path)?, ignore_errors)?;
            Ok(frame
                .body
                .windows(needle.len())
                .position(|w| w == needle)
                .map(|index| NeedleHit {
                    path: path.clone(),
                    index,
                }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(hits.into_iter().flatten().collect())
}

/// One tile that differs between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDiff {
    pub index: usize,
    pub left: Color,
    pub right: Color,
}

/// Tile-by-tile comparison of two frame images.
#[derive(Debug, Clone)]
pub struct FrameDiff {
    /// Whether both frames decode to the same body.
    pub bodies_equal: bool,
    pub mismatches: Vec<TileDiff>,
}

/// Compare two frame images tile by tile with a custom tolerance.
///
/// Both frames must decode. Tiles are sampled at their centers using the tile
/// geometry of the left frame.
pub fn diff_frames(left: &Path, right: &Path, tolerance: u8) -> Result<FrameDiff> {
    let left = surface::load(left)?;
    let right = surface::load(right)?;
    let decoded_left = decode_frame(&left, false)?;
    let decoded_right = decode_frame(&right, false)?;

    let (tw, th) = (
        decoded_left.header.tile_width as u32,
        decoded_left.header.tile_height as u32,
    );
    let mismatches = sample_tiles(&left, tw, th)
        .into_iter()
        .zip(sample_tiles(&right, tw, th))
        .enumerate()
        .filter(|(_, (a, b))| !fuzzy_equals_within(*a, *b, tolerance))
        .map(|(index, (left, right))| TileDiff { index, left, right })
        .collect();

    Ok(FrameDiff {
        bodies_equal: decoded_left.body == decoded_right.body,
        mismatches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Resolution;
    use crate::schema::VideoConfig;
    use crate::surface::Surface;
    use tempfile::tempdir;

    fn config() -> CodecConfig {
        CodecConfig {
            resolution: Resolution::new(320, 240),
            ..Default::default()
        }
    }

    #[test]
    fn test_frames_on_disk_roundtrip() {
        let dir = tempdir().unwrap();
        let payload: Vec<u8> = (0..200u32).map(|i| (i * 7 % 256) as u8).collect();

        let paths = encode_to_frames(&payload, dir.path(), &config()).unwrap();
        assert!(paths.len() >= 2);
        assert!(paths[0].ends_with("frame_001.png"));

        assert_eq!(decode_files(&paths, false).unwrap(), payload);
        assert_eq!(decode_directory(dir.path(), "png", false).unwrap(), payload);
    }

    #[test]
    fn test_reencode_replaces_stale_frames() {
        let dir = tempdir().unwrap();
        let long = encode_to_frames(&[0xAA; 300], dir.path(), &config()).unwrap();
        assert!(long.len() > 1);

        let short = encode_to_frames(b"short", dir.path(), &config()).unwrap();
        assert_eq!(short.len(), 1);
        assert_eq!(sorted_frame_paths(dir.path(), "png").unwrap(), short);
        assert_eq!(decode_directory(dir.path(), "png", false).unwrap(), b"short");
    }

    #[test]
    fn test_decode_video_leaves_workdir_alone() {
        let dir = tempdir().unwrap();
        let mine = dir.path().join("extracted");
        fs::create_dir(&mine).unwrap();
        fs::write(mine.join("notes.txt"), b"mine").unwrap();

        let bad = CodecConfig {
            video: VideoConfig {
                ffmpeg: "definitely-not-a-real-ffmpeg-binary".to_string(),
                ..Default::default()
            },
            ..config()
        };
        let err = decode_video(&dir.path().join("in.mp4"), dir.path(), &bad, false).unwrap_err();
        assert!(matches!(err, Error::Video(_)));

        // The scratch directory is gone and the existing one is untouched.
        assert_eq!(fs::read(mine.join("notes.txt")).unwrap(), b"mine");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let bad = CodecConfig {
            tile_size: Some(4),
            ..config()
        };
        assert!(matches!(
            encode_to_frames(b"x", dir.path(), &bad),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_decode_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            decode_directory(dir.path(), "png", false),
            Err(Error::NoFrames(_))
        ));
    }

    #[test]
    fn test_find_in_frames() {
        let dir = tempdir().unwrap();
        let mut payload = vec![0x11u8; 120];
        payload[70..73].copy_from_slice(&[0xDE, 0xAD, 0xBE]);

        let paths = encode_to_frames(&payload, dir.path(), &config()).unwrap();
        // 57 body tiles per frame at 32px: the needle lands in frame 2 at offset 13
        let hits = find_in_frames(&paths, &[0xDE, 0xAD, 0xBE], false).unwrap();
        assert_eq!(
            hits,
            vec![NeedleHit {
                path: paths[1].clone(),
                index: 13
            }]
        );
        assert!(find_in_frames(&paths, &[0xFF, 0xFF], false).unwrap().is_empty());
    }

    #[test]
    fn test_diff_frames() {
        let dir = tempdir().unwrap();
        let a = encode_to_frames(b"same", &dir.path().join("a"), &config()).unwrap();
        let b = encode_to_frames(b"same", &dir.path().join("b"), &config()).unwrap();
        let c = encode_to_frames(b"diff", &dir.path().join("c"), &config()).unwrap();

        let same = diff_frames(&a[0], &b[0], 17).unwrap();
        assert!(same.bodies_equal);
        assert!(same.mismatches.is_empty());

        let changed = diff_frames(&a[0], &c[0], 17).unwrap();
        assert!(!changed.bodies_equal);
        // "same" vs "diff" differ in all four body tiles
        assert_eq!(changed.mismatches.len(), 4);
    }

    #[test]
    fn test_load_frames_keeps_order() {
        let dir = tempdir().unwrap();
        let paths = encode_to_frames(&[9u8; 150], dir.path(), &config()).unwrap();
        let frames = load_frames(&paths).unwrap();
        assert_eq!(frames.len(), paths.len());
        for frame in &frames {
            assert_eq!(Surface::width(frame), 320);
        }
        let decoded = decode_frames(&frames, false).unwrap();
        let sequences: Vec<u8> = decoded.iter().map(|f| f.header.sequence).collect();
        assert_eq!(sequences, (0..paths.len() as u8).collect::<Vec<_>>());
    }
}
