//! Tilesteg CLI - Encode files into tiled video frames and back.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use tilesteg::{
    CodecConfig, Error, Resolution,
    codec::{TOLERANCE, decode_frame},
    pipeline,
    surface::{self, sorted_frame_paths},
};

#[derive(Parser)]
#[command(name = "tilesteg", version, about = "Hide files in palette-tiled video frames")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Overrides {
    /// JSON configuration file (see `example-config`)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// Frame width in pixels
    #[arg(long, short = 'W', global = true)]
    width: Option<u32>,
    /// Frame height in pixels
    #[arg(long, short = 'H', global = true)]
    height: Option<u32>,
    /// Square tile size in pixels (planned automatically when omitted)
    #[arg(long, short, global = true)]
    tile_size: Option<u32>,
    /// Video frame rate
    #[arg(long, short, global = true)]
    fps: Option<u32>,
    /// Decode unmatched tiles as zero instead of failing
    #[arg(long, short, global = true)]
    ignore_errors: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a file into frame images and a video
    Encode {
        input: PathBuf,
        output_dir: PathBuf,
        /// Video output path (defaults to <output_dir>/out.mp4)
        #[arg(long)]
        video: Option<PathBuf>,
        /// Only write frame images
        #[arg(long)]
        no_video: bool,
    },
    /// Decode a video, or a directory of frame images, into a file
    Decode {
        input: PathBuf,
        output: PathBuf,
        /// Keep the frames extracted from the video
        #[arg(long, short)]
        keep_images: bool,
        /// Directory for extracted frames (defaults to the output's directory)
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
    /// Print the decoded body of a single frame image
    DecodeFrame { file: PathBuf },
    /// Compare two frame images tile by tile
    Diff {
        file1: PathBuf,
        file2: PathBuf,
        /// Per-channel tolerance for tile colors
        #[arg(long, default_value_t = TOLERANCE - 1)]
        tolerance: u8,
    },
    /// Search decoded frames for a hex byte sequence
    Find { frames_path: PathBuf, needle: String },
    /// Extract the frames of a video into a directory
    Extract { input: PathBuf, output_dir: PathBuf },
    /// Print an example configuration
    ExampleConfig,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(overrides: &Overrides) -> Result<CodecConfig, Error> {
    let mut config = match &overrides.config {
        Some(path) => {
            let config_str = fs::read_to_string(path)?;
            serde_json::from_str::<CodecConfig>(&config_str)?
        }
        None => CodecConfig::default(),
    };

    if let Some(width) = overrides.width {
        config.resolution.width = width;
    }
    if let Some(height) = overrides.height {
        config.resolution.height = height;
    }
    if overrides.tile_size.is_some() {
        config.tile_size = overrides.tile_size;
    }
    if let Some(fps) = overrides.fps {
        config.video.framerate = fps;
    }
    config.ignore_errors |= overrides.ignore_errors;

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Error> {
    let start = Instant::now();
    let load = || load_config(&cli.overrides);

    match cli.command {
        Command::Encode {
            input,
            output_dir,
            video,
            no_video,
        } => {
            let config = load()?;
            let payload = fs::read(&input)?;
            let Resolution { width, height } = config.resolution;
            println!("Encoding {} ({} bytes)", input.display(), payload.len());
            println!("Resolution: {}x{}", width, height);

            let frames = if no_video {
                pipeline::encode_to_frames(&payload, &output_dir, &config)?
            } else {
                let video = video.unwrap_or_else(|| output_dir.join("out.mp4"));
                let frames = pipeline::encode_to_video(&payload, &output_dir, &video, &config)?;
                println!("Video: {}", video.display());
                frames
            };
            println!("Frames: {} in {}", frames.len(), output_dir.display());
        }
        Command::Decode {
            input,
            output,
            keep_images,
            workdir,
        } => {
            let config = load()?;
            let payload = if input.is_dir() {
                pipeline::decode_directory(&input, &config.frame_extension, config.ignore_errors)?
            } else {
                let workdir = workdir.unwrap_or_else(|| {
                    output
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default()
                });
                pipeline::decode_video(&input, &workdir, &config, keep_images)?
            };
            fs::write(&output, &payload)?;
            println!("Decoded {} bytes to {}", payload.len(), output.display());
        }
        Command::DecodeFrame { file } => {
            let config = load()?;
            let frame = decode_frame(&surface::load(&file)?, config.ignore_errors)?;
            let header = frame.header;
            println!(
                "Frame {} (v{}): {}x{} tiles, {} body tiles",
                header.sequence,
                header.version,
                header.tile_width,
                header.tile_height,
                header.body_length
            );
            println!("{:?}", String::from_utf8_lossy(&frame.body));
        }
        Command::Diff {
            file1,
            file2,
            tolerance,
        } => {
            let diff = pipeline::diff_frames(&file1, &file2, tolerance)?;
            if !diff.bodies_equal {
                println!("ERROR: decoded bytes not equal");
            }
            for tile in &diff.mismatches {
                println!("{}: {} != {}", tile.index, tile.left, tile.right);
            }
            println!("{} differing tile(s)", diff.mismatches.len());
        }
        Command::Find {
            frames_path,
            needle,
        } => {
            let config = load()?;
            let needle = hex::decode(needle.trim_start_matches("0x"))?;
            let paths = sorted_frame_paths(&frames_path, &config.frame_extension)?;
            for hit in pipeline::find_in_frames(&paths, &needle, config.ignore_errors)? {
                println!("needle found in {} @ index {}", hit.path.display(), hit.index);
            }
        }
        Command::Extract { input, output_dir } => {
            let config = load()?;
            let paths = pipeline::extract_frames(&input, &output_dir, &config)?;
            println!("Extracted {} frames to {}", paths.len(), output_dir.display());
        }
        Command::ExampleConfig => {
            print_example_config();
            return Ok(());
        }
    }

    println!("Time: {:.2}s", start.elapsed().as_secs_f32());
    Ok(())
}

fn print_example_config() {
    let config = CodecConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
