//! # slotgate-database
//!
//! PostgreSQL connection management, the slot ledger (PostgreSQL and
//! in-memory implementations), and the settings repository.

pub mod connection;
mod error;
pub mod ledger;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use ledger::{
    ConfirmOutcome, HoldOutcome, HolderDetails, MemorySlotLedger, PgSlotLedger, SlotLedger,
};
pub use repositories::SettingsRepository;
