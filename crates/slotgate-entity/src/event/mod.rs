//! Event entities.

pub mod capacity;
pub mod model;

pub use capacity::EventCapacity;
pub use model::Event;
