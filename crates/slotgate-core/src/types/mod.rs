//! Core type definitions used across the Slotgate workspace.

pub mod id;
pub mod settings;

pub use id::*;
pub use settings::{AdmissionSettings, SettingsLimits};
