//! Concrete repository implementations.

pub mod settings;

pub use settings::SettingsRepository;
