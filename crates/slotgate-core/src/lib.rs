//! # slotgate-core
//!
//! Core crate for Slotgate. Contains configuration schemas, typed
//! identifiers, the admission settings snapshot, domain notices published
//! to connected sessions, the settings-source seam, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other Slotgate crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
