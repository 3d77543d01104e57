//! Audited command orchestration.
//!
//! - **[`command`]**: the `Create`/`Update`/`Delete` command traits
//! - **[`orchestrator`]**: the transactional entry points that bind a
//!   mutation and its change event together
//! - **[`entity`]**: generic commands over any entity with per-backend
//!   [`EntityOps`]

pub mod command;
pub mod entity;
pub mod orchestrator;

pub use command::{AuditedCommand, CreateCommand, DeleteCommand, UpdateCommand};
pub use entity::{CreateEntity, DeleteEntity, EntityOps, UpdateEntity};
pub use orchestrator::{create, delete, update};
