//! Video transcoding through the system `ffmpeg` binary.
//!
//! No encoder is linked in. `ffmpeg` must be on `PATH` (or configured via
//! [`VideoConfig::ffmpeg`]); if it cannot be spawned a [`VideoError::Spawn`]
//! is returned and nothing falls back silently.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::schema::VideoConfig;

/// Errors from the external transcoder.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Thin wrapper that builds and runs ffmpeg command lines.
#[derive(Debug, Clone)]
pub struct Transcoder {
    config: VideoConfig,
}

impl Transcoder {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Arguments that pack numbered images into a lossy video.
    ///
    /// Every frame is a keyframe so no frame depends on its neighbours.
    pub fn images_to_video_args(&self, input_pattern: &Path, output: &Path) -> Vec<OsString> {
        let c = &self.config;
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-framerate".into(),
            c.framerate.to_string().into(),
            "-i".into(),
            input_pattern.into(),
            "-c:v".into(),
            c.codec.as_str().into(),
            "-b:v".into(),
            c.bitrate.as_str().into(),
            "-crf".into(),
            c.crf.to_string().into(),
        ];
        if !c.codec_params.is_empty() {
            args.push("-x264-params".into());
            args.push(c.codec_params.as_str().into());
        }
        args.push(output.into());
        args
    }

    /// Arguments that unpack every video frame into numbered images.
    pub fn video_to_images_args(&self, video: &Path, output_pattern: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            video.into(),
            output_pattern.into(),
        ]
    }

    /// Encode images matching a printf-style pattern (`frame_%03d.png`) to video.
    pub fn images_to_video(&self, input_pattern: &Path, output: &Path) -> Result<(), VideoError> {
        info!(
            "Packing {} into {} at {} fps",
            input_pattern.display(),
            output.display(),
            self.config.framerate
        );
        self.run(self.images_to_video_args(input_pattern, output))
    }

    /// Extract every frame of a video to images named by `output_pattern`.
    pub fn video_to_images(&self, video: &Path, output_pattern: &Path) -> Result<(), VideoError> {
        info!(
            "Extracting {} into {}",
            video.display(),
            output_pattern.display()
        );
        self.run(self.video_to_images_args(video, output_pattern))
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), VideoError> {
        let program = self.config.ffmpeg.clone();
        debug!("Running {} {:?}", program, args);

        let output = Command::new(&program)
            .arg("-hide_banner")
            .args(&args)
            .output()
            .map_err(|source| VideoError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(VideoError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(VideoConfig::default())
    }
}
