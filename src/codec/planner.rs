//! Tile size planning.
//!
//! Payloads that overflow a single frame use the smallest tile to minimize the
//! frame count. Payloads that fit get the largest tile the layout heuristic
//! allows, since bigger tiles survive compression better.

use super::HEADER_TILES;
use crate::schema::Resolution;

/// Smallest tile edge the planner will choose.
pub const MIN_TILE_SIZE: u32 = 32;

/// Largest tile edge representable in the one-byte header field.
pub const MAX_TILE_SIZE: u32 = 255;

/// Smallest tile edge whose first tile still contains the 8px header probe.
pub const MIN_DECODABLE_TILE_SIZE: u32 = 9;

/// Strategy for choosing a square tile size.
pub trait TilePlanner {
    /// Returns `(tile_width, tile_height)` for a payload of `payload_len` bytes.
    fn plan(&self, payload_len: usize, resolution: Resolution) -> (u32, u32);
}

/// Factor-pair layout heuristic.
///
/// Factors the total tile count (payload plus header) and takes the middle
/// factor pair as the grid shape. It does not look for the pair closest to the
/// frame's aspect ratio, so the result is a reasonable size rather than the
/// largest possible one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactorPairPlanner;

impl TilePlanner for FactorPairPlanner {
    fn plan(&self, payload_len: usize, resolution: Resolution) -> (u32, u32) {
        let max_body_tiles = resolution
            .tile_capacity(MIN_TILE_SIZE, MIN_TILE_SIZE)
            .saturating_sub(HEADER_TILES);

        if payload_len >= max_body_tiles {
            return (MIN_TILE_SIZE, MIN_TILE_SIZE);
        }

        let total_tiles = payload_len + HEADER_TILES;
        let (small, large) = middle_factor_pair(total_tiles);

        let max_tile_width = MIN_TILE_SIZE.max(resolution.width / large as u32);
        let max_tile_height = MIN_TILE_SIZE.max(resolution.height / small as u32);
        let mut tile = max_tile_width.min(max_tile_height).min(MAX_TILE_SIZE);

        // The factor pair ignores which axis is which, so the chosen size can
        // overshoot the frame. Shrink until the whole payload fits.
        while tile > MIN_TILE_SIZE && !fits(total_tiles, resolution, tile) {
            tile -= 1;
        }

        (tile, tile)
    }
}

#[inline]
fn fits(total_tiles: usize, resolution: Resolution, tile: u32) -> bool {
    resolution.width / tile >= 2 && resolution.tile_capacity(tile, tile) >= total_tiles
}

/// Non-trivial factors of `n` in ascending order.
fn factors(n: usize) -> impl Iterator<Item = usize> {
    (2..=n / 2).filter(move |i| n % i == 0)
}

/// Middle pair of the factor list of `n`, retrying with `n + 1` when `n` is
/// prime. A lone factor (a prime square) pairs with itself.
fn middle_factor_pair(n: usize) -> (usize, usize) {
    let mut list: Vec<usize> = factors(n).collect();
    if list.is_empty() {
        list = factors(n + 1).collect();
    }

    match list.len() {
        0 => (1, n.max(1)),
        1 => (list[0], list[0]),
        len => {
            let mid = len / 2 - 1;
            (list[mid], list[mid + 1])
        }
    }
}
