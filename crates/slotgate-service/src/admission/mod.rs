//! Admission queue: bounded active set plus FIFO waiting queue.

pub mod coordinator;
pub mod state;

pub use coordinator::{AdmissionCoordinator, AdmissionCounts, PurgeReport, Requeued};
pub use state::{AdmissionState, Placement};
