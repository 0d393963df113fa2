//! Splitting a payload across frames and joining decoded frames back together.

use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;

use super::error::{DecodeError, EncodeError};
use super::frame::{DecodedFrame, FrameWriter, decode_frame};
use super::header::HEADER_TILES;
use super::planner::{FactorPairPlanner, TilePlanner};
use crate::schema::Resolution;
use crate::surface::{FrameSink, Surface};

/// Frame layout chosen for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPlan {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Body tiles per frame, except possibly the last.
    pub tiles_per_frame: usize,
    pub frame_count: usize,
    pub payload_len: usize,
}

impl StreamPlan {
    /// Declared body length of the frame at `index` (0-based).
    ///
    /// The last frame carries whatever remains rather than a full frame.
    pub fn body_length(&self, index: usize) -> usize {
        if index + 1 >= self.frame_count {
            self.payload_len
                .saturating_sub(self.tiles_per_frame * (self.frame_count - 1))
        } else {
            self.tiles_per_frame
        }
    }
}

/// Encodes payloads into frames handed to a [`FrameSink`].
#[derive(Debug, Clone)]
pub struct StreamEncoder<P: TilePlanner = FactorPairPlanner> {
    resolution: Resolution,
    tile_size: Option<u32>,
    planner: P,
}

impl StreamEncoder {
    /// Encoder using the default tile planner.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            tile_size: None,
            planner: FactorPairPlanner,
        }
    }
}

impl<P: TilePlanner> StreamEncoder<P> {
    /// Use a fixed square tile size instead of planning one.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    /// Swap the tile planning strategy.
    pub fn with_planner<Q: TilePlanner>(self, planner: Q) -> StreamEncoder<Q> {
        StreamEncoder {
            resolution: self.resolution,
            tile_size: self.tile_size,
            planner,
        }
    }

    /// Work out tile size and frame split for a payload length.
    pub fn plan(&self, payload_len: usize) -> Result<StreamPlan, EncodeError> {
        let (tile_width, tile_height) = match self.tile_size {
            Some(size) => (size, size),
            None => self.planner.plan(payload_len, self.resolution),
        };
        if tile_width != tile_height {
            return Err(EncodeError::NonSquareTile {
                width: tile_width,
                height: tile_height,
            });
        }

        let capacity = self.resolution.tile_capacity(tile_width, tile_height);
        let body_capacity = capacity.saturating_sub(HEADER_TILES).min(u16::MAX as usize);
        if body_capacity == 0 && payload_len > 0 {
            return Err(EncodeError::HeaderDoesNotFit {
                capacity,
                columns: self.resolution.width / tile_width.max(1),
            });
        }

        let tiles_per_frame = body_capacity.min(payload_len);
        let frame_count = if payload_len == 0 {
            1
        } else {
            payload_len.div_ceil(tiles_per_frame)
        };

        Ok(StreamPlan {
            tile_width,
            tile_height,
            tiles_per_frame,
            frame_count,
            payload_len,
        })
    }

    /// Encode `payload` into frames, persisting each one as it fills.
    ///
    /// Returns the sink's identifiers in frame order.
    pub fn encode<K: FrameSink>(&self, payload: &[u8], sink: &mut K) -> Result<Vec<K::Id>, EncodeError> {
        let plan = self.plan(payload.len())?;
        info!(
            "Encoding {} bytes into {} frame(s) of {}x{} tiles, {} tiles per frame",
            payload.len(),
            plan.frame_count,
            plan.tile_width,
            plan.tile_height,
            plan.tiles_per_frame
        );

        let new_frame = |sequence: u8, index: usize| {
            FrameWriter::<RgbImage>::new(
                sequence,
                plan.body_length(index),
                self.resolution,
                plan.tile_width,
                plan.tile_height,
            )
        };

        let mut ids = Vec::with_capacity(plan.frame_count);
        let mut sequence = 0u8;
        let mut frame_number = 1;
        let mut frame = new_frame(sequence, 0)?;

        for &byte in payload {
            if frame.write(byte) == 0 {
                sequence = sequence.wrapping_add(1);
                let next = new_frame(sequence, frame_number)?;
                let finished = std::mem::replace(&mut frame, next);
                ids.push(sink.persist(frame_number, finished.into_surface())?);

                frame_number += 1;
                frame.write(byte);
            }
        }

        ids.push(sink.persist(frame_number, frame.into_surface())?);
        debug_assert_eq!(ids.len(), plan.frame_count);

        Ok(ids)
    }
}

/// Decode frames independently, in parallel, keeping the caller's order.
pub fn decode_frames<S: Surface + Sync>(
    frames: &[S],
    ignore_errors: bool,
) -> Result<Vec<DecodedFrame>, DecodeError> {
    frames
        .par_iter()
        .map(|surface| decode_frame(surface, ignore_errors))
        .collect()
}

/// Concatenate decoded frame bodies in the order given.
///
/// Sequence numbers are checked and a gap is logged, but frames are never
/// reordered.
pub fn join_frames(frames: &[DecodedFrame]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(frames.iter().map(|f| f.body.len()).sum());
    let mut expected = frames.first().map(|f| f.header.sequence);

    for (i, frame) in frames.iter().enumerate() {
        if let Some(seq) = expected
            && frame.header.sequence != seq
        {
            warn!(
                "Frame {} has sequence number {}, expected {}",
                i, frame.header.sequence, seq
            );
        }
        expected = Some(frame.header.sequence.wrapping_add(1));
        payload.extend_from_slice(&frame.body);
    }

    payload
}

/// Decode a sequence of frame surfaces back into the payload.
pub fn decode_stream<S: Surface + Sync>(frames: &[S], ignore_errors: bool) -> Result<Vec<u8>, DecodeError> {
    Ok(join_frames(&decode_frames(frames, ignore_errors)?))
}
