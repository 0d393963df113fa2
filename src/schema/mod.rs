//! Schema module - Configuration types for the codec and transcoder.

mod config;

pub use config::*;
