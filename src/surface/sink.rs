//! Destinations for finished frames and frame file naming.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, warn};

use super::{SurfaceError, save};

/// Receives each finished frame as soon as it is complete.
pub trait FrameSink {
    /// Identifier returned for a persisted frame.
    type Id;

    /// Persist one frame. `frame_number` is 1-indexed.
    fn persist(&mut self, frame_number: usize, image: RgbImage) -> Result<Self::Id, SurfaceError>;
}

/// `prefix_NNN.ext`, 1-indexed and zero-padded to three digits.
pub fn frame_file_name(prefix: &str, frame_number: usize, extension: &str) -> String {
    format!("{prefix}_{frame_number:03}.{extension}")
}

/// Writes frames as numbered image files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl DirectorySink {
    /// Create a sink, creating `dir` if needed.
    ///
    /// Frames already in `dir` under the same prefix and extension are
    /// removed first so they cannot be read back as part of this stream.
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<Self, SurfaceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let removed = clear_frames(&dir, prefix, extension)?;
        if removed > 0 {
            warn!("Removed {} stale frame(s) from {}", removed, dir.display());
        }
        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            extension: extension.to_string(),
        })
    }

    /// printf-style input pattern matching the files this sink writes.
    pub fn pattern(&self) -> PathBuf {
        self.dir
            .join(format!("{}_%03d.{}", self.prefix, self.extension))
    }
}

impl FrameSink for DirectorySink {
    type Id = PathBuf;

    fn persist(&mut self, frame_number: usize, image: RgbImage) -> Result<PathBuf, SurfaceError> {
        let path = self
            .dir
            .join(frame_file_name(&self.prefix, frame_number, &self.extension));
        save(&image, &path)?;
        debug!("Saved frame {} to {}", frame_number, path.display());
        Ok(path)
    }
}

/// Keeps frames in memory. The id is the index into [`MemorySink::frames`].
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<RgbImage>,
}

impl FrameSink for MemorySink {
    type Id = usize;

    fn persist(&mut self, _frame_number: usize, image: RgbImage) -> Result<usize, SurfaceError> {
        self.frames.push(image);
        Ok(self.frames.len() - 1)
    }
}

/// Files in `dir` with the given extension, ordered by the last number in
/// their file name. Files without a number sort first, by name.
pub fn sorted_frame_paths<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>, SurfaceError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort_by_cached_key(|p| {
        let stem = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (last_number(&stem), stem)
    });
    Ok(paths)
}

/// Delete files in `dir` named `prefix_NNN.ext`. Returns how many were removed.
pub fn clear_frames<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<usize, SurfaceError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| is_frame_file(n, prefix, extension));
        if is_frame && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn is_frame_file(name: &str, prefix: &str, extension: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(extension))
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn last_number(s: &str) -> Option<u64> {
    // ASCII digits never occur inside a multi-byte character, so byte
    // offsets around them are char boundaries.
    let bytes = s.as_bytes();
    let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    s[start..end].parse().ok()
}
