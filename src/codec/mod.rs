//! Codec module - Palette tiles, frame layout and multi-frame chunking.

mod cursor;
mod error;
mod frame;
mod fuzzy;
mod header;
mod palette;
mod planner;
mod stream;

pub use cursor::*;
pub use error::*;
pub use frame::*;
pub use fuzzy::*;
pub use header::*;
pub use palette::*;
pub use planner::*;
pub use stream::*;
