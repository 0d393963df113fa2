//! The fixed 256-color palette mapping byte values to tile colors.
//!
//! Channel values are restricted to `16..240` so that lossy compression has
//! room to drift without clipping. Entries are spaced [`CHANNEL_SPACING`]
//! apart on at least one channel, which keeps every pair distinguishable under
//! the fuzzy tolerance.

use std::fmt;
use std::sync::LazyLock;

/// Number of palette entries. The index is the encoded byte value.
pub const PALETTE_SIZE: usize = 256;

/// Lowest channel value used by non-reserved entries.
pub const CHANNEL_MIN: u8 = 16;

/// Exclusive upper bound of channel values used by non-reserved entries.
pub const CHANNEL_MAX: u8 = 240;

/// Distance between adjacent channel levels.
pub const CHANNEL_SPACING: u8 = 37;

/// Index of the reserved null color (exact black).
pub const NULL_INDEX: u8 = 0x00;

/// Index of the reserved white color, used as the second magic tile.
pub const WHITE_INDEX: u8 = 0xFF;

/// An RGB color sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    /// Near-white: bounded at [`CHANNEL_MAX`] rather than 255.
    pub const WHITE: Color = Color::new(CHANNEL_MAX, CHANNEL_MAX, CHANNEL_MAX);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Add a signed offset to every channel, saturating at the channel range.
    pub fn offset(self, dr: i16, dg: i16, db: i16) -> Self {
        let shift = |v: u8, d: i16| (v as i16 + d).clamp(0, 255) as u8;
        Self::new(shift(self.r, dr), shift(self.g, dg), shift(self.b, db))
    }
}

impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.channels()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Immutable byte-to-color lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Color; PALETTE_SIZE],
}

static DEFAULT_PALETTE: LazyLock<Palette> = LazyLock::new(Palette::generate);

impl Palette {
    /// The process-wide default palette, built once on first use.
    pub fn global() -> &'static Palette {
        &DEFAULT_PALETTE
    }

    /// Build the default palette.
    ///
    /// Levels `16, 53, 90, ..., 238` are combined as the Cartesian product
    /// `r × g × b` (blue varying fastest) and truncated to 255 entries. Index 0
    /// is then forced to exact black and index 255 to [`Color::WHITE`].
    pub fn generate() -> Self {
        let levels: Vec<u8> = (CHANNEL_MIN..CHANNEL_MAX)
            .step_by(CHANNEL_SPACING as usize)
            .collect();
        let levels = levels.as_slice();

        let mut colors = [Color::BLACK; PALETTE_SIZE];
        let product = levels.iter().flat_map(move |&r| {
            levels
                .iter()
                .flat_map(move |&g| levels.iter().map(move |&b| Color::new(r, g, b)))
        });
        for (slot, color) in colors.iter_mut().zip(product).take(PALETTE_SIZE - 1) {
            *slot = color;
        }

        colors[NULL_INDEX as usize] = Color::BLACK;
        colors[WHITE_INDEX as usize] = Color::WHITE;

        Self { colors }
    }

    /// Color assigned to a byte value.
    #[inline]
    pub fn color(&self, byte: u8) -> Color {
        self.colors[byte as usize]
    }

    /// All entries in index order.
    #[inline]
    pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
        &self.colors
    }

    pub fn null(&self) -> Color {
        self.color(NULL_INDEX)
    }

    pub fn white(&self) -> Color {
        self.color(WHITE_INDEX)
    }
}
