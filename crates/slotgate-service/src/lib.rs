//! # slotgate-service
//!
//! Business logic for Slotgate: the admission queue coordinator, the
//! reservation state machine, the outbound notification queue, and the
//! transport-agnostic session gateway that ties them together.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod admission;
pub mod notify;
pub mod reservation;
pub mod session;

pub use admission::{AdmissionCoordinator, AdmissionCounts, Placement};
pub use notify::{CapacityBroadcaster, NotificationPublisher};
pub use reservation::ReservationService;
pub use session::SessionGateway;
