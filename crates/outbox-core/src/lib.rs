//! `outbox-core`: durable write buffer for clients with unreliable
//! connectivity.
//!
//! # Architecture
//!
//! ```text
//! caller ──submit──▶ Coordinator ──online──▶ Submitter (HTTP)
//!                        │  ▲
//!               offline/ │  │ online event
//!               failure  ▼  │
//!                   QueueStore   ConnectivitySignal ◀── ReachabilityProbe
//!                   (redb)
//! ```
//!
//! Actions that cannot be delivered immediately are persisted in a
//! [`QueueStore`]. When the [`ConnectivitySignal`] reports online, the
//! [`Coordinator`] replays the queue in arrival order and clears it.

pub mod action;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod io;
pub mod paths;
pub mod probe;
pub mod store;
pub mod submit;

pub use action::{ActionTarget, QueuedAction};
pub use config::OutboxConfig;
pub use connectivity::{Connectivity, ConnectivitySignal, ConnectivityWatch};
pub use coordinator::{
    Coordinator, CoordinatorState, DrainOutcome, DrainReport, OutboxEvent, QueueReason,
    ReplayFailure, SubmitOutcome,
};
pub use error::{OutboxError, Result};
pub use probe::ReachabilityProbe;
pub use store::{MemoryQueueStore, QueueStore, RedbQueueStore};
pub use submit::{HttpSubmitter, Submitter};
