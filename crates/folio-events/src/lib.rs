//! # folio-events
//!
//! Audited change-event engine for the Folio data layer.
//!
//! Every Create/Update/Delete on an audited entity commits together with an
//! immutable change-event row describing it, or not at all:
//!
//! - **Change events**: [`ChangeEvent`] rows keyed by ULID, ordered by [`Hlc`](folio_core::Hlc)
//! - **Backends**: `SQLite` always; `PostgreSQL` and `MySQL` behind the
//!   `postgres` / `mysql` features, each behind the same [`Backend`] seam
//! - **Orchestrator**: [`create`], [`update`], [`delete`] bind a mutation and
//!   its audit record into one transaction
//! - **Driver normalization**: per-backend row types mapped onto one canonical
//!   entity type ([`entities`])
//! - **Lifecycle**: independent synced/consumed flags drained by
//!   [`lifecycle::drain_unsynced`] and [`lifecycle::drain_unconsumed`]
//! - **Migrations**: version-tracked SQL schema per backend

#![deny(unsafe_code)]

pub mod audited;
pub mod backend;
pub mod change_event;
pub mod entities;
pub mod errors;
pub mod lifecycle;
pub mod recorder;
pub mod store;

pub use audited::{
    AuditedCommand, CreateCommand, CreateEntity, DeleteCommand, DeleteEntity, EntityOps,
    UpdateCommand, UpdateEntity, create, delete, update,
};
pub use backend::sqlite::Sqlite;
pub use backend::{Backend, ConnectionConfig, Database, Transactional, Tx, TxHandle};
pub use change_event::{Action, ChangeEvent, ChangeEventParams, CustomAction, JsonBlob, Operation};
pub use entities::{ContentData, Entity, User};
pub use errors::{AuditError, Result, StoreError, TxPhase};
pub use lifecycle::{DrainReport, HandlerFailure, drain_batch, drain_unconsumed, drain_unsynced};
pub use recorder::ChangeEventRecorder;
pub use store::{ChangeEventLog, LifecycleFlag};

#[cfg(feature = "mysql")]
pub use backend::mysql::MySql;
#[cfg(feature = "postgres")]
pub use backend::postgres::Postgres;
