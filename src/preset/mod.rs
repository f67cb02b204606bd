//! Presets: recorded prompt sequences that can be replayed on a new image.

pub mod library;
pub mod replay;
pub mod types;

pub use library::PresetLibrary;
pub use types::{Preset, PresetAction, PresetProgress};
