//! Background tasks for Slotgate.
//!
//! This crate provides:
//! - The expiry sweeper that reaps lapsed holds, drops stale queue entries,
//!   and requeues sessions whose choice window ran out
//! - An interval scheduler that runs the sweeper on a fixed cadence

pub mod scheduler;
pub mod sweeper;

pub use scheduler::SweepScheduler;
pub use sweeper::{ExpirySweeper, SweepReport};
