//! Command traits consumed by the orchestrator.
//!
//! A command carries one mutation request plus everything needed to audit
//! it: target table, audit context, database handle, and the hooks that run
//! inside the shared transaction.

use folio_core::{AuditContext, RecordId};
use serde::Serialize;

use crate::backend::{Backend, Database, Tx};
use crate::change_event::{Action, JsonBlob, Operation};
use crate::errors::Result;

/// Shared surface of every audited command.
pub trait AuditedCommand {
    /// Backend the command runs against.
    type Backend: Backend;

    /// Table recorded in the change event.
    fn table_name(&self) -> &str;

    /// Provenance copied onto the change event.
    fn audit_context(&self) -> &AuditContext;

    /// Database handle supplying the connection, recorder and clock.
    fn database(&self) -> &Database<Self::Backend>;

    /// Caller metadata stored with the event.
    fn metadata(&self) -> Option<JsonBlob> {
        None
    }
}

/// An audited insert.
pub trait CreateCommand: AuditedCommand {
    /// Persisted row type.
    type Row: Serialize;

    /// Semantic action recorded for this insert.
    fn action(&self) -> Action {
        Operation::Insert.default_action()
    }

    /// Perform the insert and return the persisted row.
    fn execute(&self, tx: &mut Tx<'_, Self::Backend>) -> Result<Self::Row>;

    /// ID of the persisted row.
    fn record_id(&self, row: &Self::Row) -> RecordId;
}

/// An audited update.
pub trait UpdateCommand: AuditedCommand {
    /// Row type snapshotted before the update.
    type Row: Serialize;
    /// Update parameters, recorded as the event's new values.
    type Params: Serialize;

    /// Semantic action recorded for this update (e.g. `Publish`).
    fn action(&self) -> Action {
        Operation::Update.default_action()
    }

    /// Target row.
    fn record_id(&self) -> &RecordId;

    /// Update parameters.
    fn params(&self) -> &Self::Params;

    /// Read the current row. `None` aborts the command with `NotFound`.
    fn get_before(&self, tx: &mut Tx<'_, Self::Backend>) -> Result<Option<Self::Row>>;

    /// Perform the update.
    fn execute(&self, tx: &mut Tx<'_, Self::Backend>) -> Result<()>;
}

/// An audited delete.
pub trait DeleteCommand: AuditedCommand {
    /// Row type snapshotted before the delete.
    type Row: Serialize;

    /// Semantic action recorded for this delete (e.g. `Archive`).
    fn action(&self) -> Action {
        Operation::Delete.default_action()
    }

    /// Target row.
    fn record_id(&self) -> &RecordId;

    /// Read the current row. `None` aborts the command with `NotFound`.
    fn get_before(&self, tx: &mut Tx<'_, Self::Backend>) -> Result<Option<Self::Row>>;

    /// Perform the delete.
    fn execute(&self, tx: &mut Tx<'_, Self::Backend>) -> Result<()>;
}
