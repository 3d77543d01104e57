//! Audited Create/Update/Delete.
//!
//! Each entry point runs one mutation and its change event in a single
//! transaction:
//!
//! 1. check out a connection and begin
//! 2. (update/delete) snapshot the current row, `NotFound` if absent
//! 3. execute the mutation
//! 4. stamp a change event (fresh `EventId`, `Hlc`, wall time) and write it
//!    through the database's recorder on the same transaction
//! 5. commit
//!
//! Any failure, or a cancellation observed before commit, rolls the whole
//! transaction back. There is no retry and no version check: concurrent
//! writers to one row are ordered by the database's row locks alone.

use folio_core::RecordId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::command::{AuditedCommand, CreateCommand, DeleteCommand, UpdateCommand};
use crate::backend::{Transactional, Tx, TxHandle};
use crate::change_event::{Action, ChangeEventParams, JsonBlob, Operation};
use crate::errors::{AuditError, StoreError, TxPhase};

type AuditResult<T> = std::result::Result<T, AuditError>;

/// Insert a row and record an `Insert` event with the row as new values.
pub fn create<C: CreateCommand>(cmd: &C, cancel: &CancellationToken) -> AuditResult<C::Row> {
    ensure_live(cancel)?;
    let mut conn = cmd.database().conn().map_err(begin_failed)?;
    let mut tx = conn.begin().map_err(begin_failed)?;
    let outcome = create_in_tx(cmd, &mut tx, cancel);
    finish(tx, outcome, cancel)
}

/// Update a row and record an `Update` event (old = snapshot, new = params).
pub fn update<C: UpdateCommand>(cmd: &C, cancel: &CancellationToken) -> AuditResult<()> {
    ensure_live(cancel)?;
    let mut conn = cmd.database().conn().map_err(begin_failed)?;
    let mut tx = conn.begin().map_err(begin_failed)?;
    let outcome = update_in_tx(cmd, &mut tx, cancel);
    finish(tx, outcome, cancel)
}

/// Delete a row and record a `Delete` event (old = snapshot, new = none).
pub fn delete<C: DeleteCommand>(cmd: &C, cancel: &CancellationToken) -> AuditResult<()> {
    ensure_live(cancel)?;
    let mut conn = cmd.database().conn().map_err(begin_failed)?;
    let mut tx = conn.begin().map_err(begin_failed)?;
    let outcome = delete_in_tx(cmd, &mut tx, cancel);
    finish(tx, outcome, cancel)
}

// ─────────────────────────────────────────────────────────────────────────────
// Steps inside the transaction
// ─────────────────────────────────────────────────────────────────────────────

fn create_in_tx<C: CreateCommand>(
    cmd: &C,
    tx: &mut Tx<'_, C::Backend>,
    cancel: &CancellationToken,
) -> AuditResult<C::Row> {
    let table = cmd.table_name();
    let row = cmd.execute(tx).map_err(|source| execute_failed(table, source))?;
    ensure_live(cancel)?;

    let record_id = cmd.record_id(&row);
    let new_values = encode(table, &row)?;
    let params = stamp(
        cmd,
        record_id,
        Operation::Insert,
        cmd.action(),
        None,
        Some(new_values),
    );
    record(cmd, tx, &params)?;
    Ok(row)
}

fn update_in_tx<C: UpdateCommand>(
    cmd: &C,
    tx: &mut Tx<'_, C::Backend>,
    cancel: &CancellationToken,
) -> AuditResult<()> {
    let table = cmd.table_name();
    let record_id = cmd.record_id();
    let before = snapshot(table, record_id, cmd.get_before(tx))?;
    ensure_live(cancel)?;

    cmd.execute(tx).map_err(|source| execute_failed(table, source))?;
    ensure_live(cancel)?;

    let old_values = encode(table, &before)?;
    let new_values = encode(table, cmd.params())?;
    let params = stamp(
        cmd,
        record_id.clone(),
        Operation::Update,
        cmd.action(),
        Some(old_values),
        Some(new_values),
    );
    record(cmd, tx, &params)
}

fn delete_in_tx<C: DeleteCommand>(
    cmd: &C,
    tx: &mut Tx<'_, C::Backend>,
    cancel: &CancellationToken,
) -> AuditResult<()> {
    let table = cmd.table_name();
    let record_id = cmd.record_id();
    let before = snapshot(table, record_id, cmd.get_before(tx))?;
    ensure_live(cancel)?;

    cmd.execute(tx).map_err(|source| execute_failed(table, source))?;
    ensure_live(cancel)?;

    let old_values = encode(table, &before)?;
    let params = stamp(
        cmd,
        record_id.clone(),
        Operation::Delete,
        cmd.action(),
        Some(old_values),
        None,
    );
    record(cmd, tx, &params)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn snapshot<R>(
    table: &str,
    record_id: &RecordId,
    before: crate::errors::Result<Option<R>>,
) -> AuditResult<R> {
    match before {
        Ok(Some(row)) => Ok(row),
        Ok(None) => Err(AuditError::NotFound {
            table: table.to_owned(),
            record_id: record_id.to_string(),
        }),
        Err(err) if err.is_not_found() => Err(AuditError::NotFound {
            table: table.to_owned(),
            record_id: record_id.to_string(),
        }),
        Err(source) => Err(execute_failed(table, source)),
    }
}

fn stamp<C: AuditedCommand>(
    cmd: &C,
    record_id: RecordId,
    operation: Operation,
    action: Action,
    old_values: Option<JsonBlob>,
    new_values: Option<JsonBlob>,
) -> ChangeEventParams {
    ChangeEventParams {
        action,
        old_values,
        new_values,
        metadata: cmd.metadata(),
        ..ChangeEventParams::new(
            cmd.audit_context(),
            cmd.database().clock().now(),
            cmd.table_name(),
            record_id,
            operation,
        )
    }
}

fn record<C: AuditedCommand>(
    cmd: &C,
    tx: &mut Tx<'_, C::Backend>,
    params: &ChangeEventParams,
) -> AuditResult<()> {
    cmd.database()
        .recorder()
        .record(tx, params)
        .map_err(|source| AuditError::Record {
            table: params.table_name.clone(),
            record_id: params.record_id.to_string(),
            source,
        })?;
    debug!(
        event_id = %params.event_id,
        table = %params.table_name,
        record_id = %params.record_id,
        operation = %params.operation,
        action = %params.action,
        hlc = %params.hlc_timestamp,
        "change event recorded"
    );
    Ok(())
}

fn encode<T: Serialize + ?Sized>(table: &str, value: &T) -> AuditResult<JsonBlob> {
    JsonBlob::encode(value).map_err(|source| AuditError::Serialization {
        table: table.to_owned(),
        source,
    })
}

fn ensure_live(cancel: &CancellationToken) -> AuditResult<()> {
    if cancel.is_cancelled() {
        Err(AuditError::Cancelled)
    } else {
        Ok(())
    }
}

fn begin_failed(source: StoreError) -> AuditError {
    AuditError::Transaction {
        phase: TxPhase::Begin,
        source,
    }
}

fn execute_failed(table: &str, source: StoreError) -> AuditError {
    AuditError::Execute {
        table: table.to_owned(),
        source,
    }
}

/// Commit on success (unless cancelled), otherwise roll back.
fn finish<T, X: TxHandle>(
    tx: X,
    outcome: AuditResult<T>,
    cancel: &CancellationToken,
) -> AuditResult<T> {
    let value = match outcome.and_then(|value| ensure_live(cancel).map(|()| value)) {
        Ok(value) => value,
        Err(err) => return Err(rollback(tx, err)),
    };
    tx.commit().map_err(|source| AuditError::Transaction {
        phase: TxPhase::Commit,
        source,
    })?;
    Ok(value)
}

fn rollback<X: TxHandle>(tx: X, err: AuditError) -> AuditError {
    warn!(error = %err, "audited command failed, rolling back");
    match tx.rollback() {
        Ok(()) => err,
        Err(source) => AuditError::Rollback {
            original: Box::new(err),
            source,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
