//! Core traits defined in `slotgate-core` and implemented by other crates.

pub mod settings;

pub use settings::{SettingsSource, StaticSettings};
