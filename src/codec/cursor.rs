//! Raster-scan tile geometry.
//!
//! Writing walks tiles left to right, wrapping to the next tile row, until no
//! further whole tile fits. Every transition is a pure function of the grid
//! and the previous state, so the scan can be tested without a pixel surface.

/// Frame and tile dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

/// Write cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing drawn yet; the next tile goes at the origin.
    Created,
    /// The next tile goes at pixel `(x, y)`.
    Writing { x: u32, y: u32 },
    /// No whole tile fits at the cursor.
    Full,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
        }
    }

    /// Number of tile columns.
    #[inline]
    pub fn columns(&self) -> u32 {
        self.width.checked_div(self.tile_width).unwrap_or(0)
    }

    /// Number of tile rows.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.height.checked_div(self.tile_height).unwrap_or(0)
    }

    /// Total number of whole tiles.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Initial cursor state. A grid with no room for a single tile starts full.
    pub fn start(&self) -> CursorState {
        if self.capacity() == 0 {
            CursorState::Full
        } else {
            CursorState::Created
        }
    }

    /// Top-left pixel of the tile under the cursor.
    pub fn position(&self, state: CursorState) -> Option<(u32, u32)> {
        match state {
            CursorState::Created => Some((0, 0)),
            CursorState::Writing { x, y } => Some((x, y)),
            CursorState::Full => None,
        }
    }

    /// State after drawing one tile at the cursor.
    pub fn advance(&self, state: CursorState) -> CursorState {
        let Some((mut x, mut y)) = self.position(state) else {
            return CursorState::Full;
        };

        x += self.tile_width;
        if x + self.tile_width > self.width {
            x = 0;
            y += self.tile_height;
        }
        if y + self.tile_height > self.height {
            return CursorState::Full;
        }

        CursorState::Writing { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_order() {
        let grid = TileGrid::new(100, 40, 30, 20);
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);

        let mut state = grid.start();
        let mut visited = Vec::new();
        while let Some(pos) = grid.position(state) {
            visited.push(pos);
            state = grid.advance(state);
        }

        assert_eq!(
            visited,
            vec![(0, 0), (30, 0), (60, 0), (0, 20), (30, 20), (60, 20)]
        );
        assert_eq!(visited.len(), grid.capacity());
        assert_eq!(state, CursorState::Full);
    }

    #[test]
    fn test_full_is_terminal() {
        let grid = TileGrid::new(64, 64, 32, 32);
        assert_eq!(grid.advance(CursorState::Full), CursorState::Full);
        assert_eq!(grid.position(CursorState::Full), None);
    }

    #[test]
    fn test_tile_larger_than_frame() {
        let grid = TileGrid::new(16, 16, 32, 32);
        assert_eq!(grid.capacity(), 0);
        assert_eq!(grid.start(), CursorState::Full);
    }

    #[test]
    fn test_single_tile_grid() {
        let grid = TileGrid::new(40, 40, 32, 32);
        assert_eq!(grid.start(), CursorState::Created);
        assert_eq!(grid.advance(grid.start()), CursorState::Full);
    }
}
