//! Tilesteg - hide binary payloads in palette-tiled video frames.
//!
//! Every payload byte becomes one flat-colored tile picked from a fixed
//! 256-color palette. Frames carry a 13-tile header followed by body tiles in
//! raster order, and are packed into a lossy video by an external transcoder.
//! Decoding samples tile centers and matches colors with a per-channel
//! tolerance wide enough to survive the compression round trip.
//!
//! # Architecture
//!
//! - `schema`: Configuration types
//! - `codec`: Palette, fuzzy matching, tile planning, frame and stream codecs
//! - `surface`: Pixel buffers, image files and frame sinks
//! - `video`: `ffmpeg` wrapper
//! - `pipeline`: File-level encode/decode flows
//!
//! # Example
//!
//! ```rust
//! use tilesteg::{
//!     codec::{StreamEncoder, decode_stream},
//!     schema::Resolution,
//!     surface::MemorySink,
//! };
//!
//! let encoder = StreamEncoder::new(Resolution::new(1280, 720)).with_tile_size(160);
//! let mut sink = MemorySink::default();
//! encoder.encode(b"Hi!", &mut sink).unwrap();
//!
//! assert_eq!(sink.frames.len(), 1);
//! assert_eq!(decode_stream(&sink.frames, false).unwrap(), b"Hi!");
//! ```

pub mod codec;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod surface;
pub mod video;

// Re-export commonly used types
pub use codec::{FrameWriter, Palette, StreamEncoder, decode_frame, decode_stream};
pub use error::{Error, Result};
pub use schema::{CodecConfig, Resolution, VideoConfig};
