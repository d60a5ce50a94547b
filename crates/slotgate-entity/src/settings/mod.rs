//! Settings entities.

pub mod model;

pub use model::SettingsRow;
