//! # folio-core
//!
//! Foundation types shared by every Folio data-layer crate:
//!
//! - **Branded IDs**: `EventId`, `RecordId`, `UserId` (ULIDs) and `NodeId`
//! - **Hybrid logical clock**: [`Hlc`] timestamps and the lock-free [`HybridLogicalClock`]
//! - **Audit context**: [`AuditContext`] threaded through every mutation
//! - **Backend kind**: [`BackendKind`] naming the three SQL backends
//! - **Time**: millisecond-truncated wall-clock helpers
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod audit;
pub mod backend;
pub mod hlc;
pub mod ids;
pub mod logging;
pub mod time;

pub use audit::AuditContext;
pub use backend::BackendKind;
pub use hlc::{Hlc, HybridLogicalClock, PhysicalClock, SystemClock};
pub use ids::{EventId, InvalidId, NodeId, RecordId, UserId, ULID_LEN, is_ulid};
