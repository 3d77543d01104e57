//! Change-event repository for the `change_events` table.
//!
//! Timestamps are stored as epoch milliseconds and converted at this
//! boundary. The provenance columns are `request_ref` and `client_ip`.

use ::mysql::prelude::Queryable;
use ::mysql::{Params, Row, Value};
use chrono::{DateTime, Utc};
use folio_core::time::to_epoch_ms;
use folio_core::{EventId, Hlc, NodeId, RecordId, UserId};

use super::take;
use crate::change_event::{Action, ChangeEvent, ChangeEventParams, JsonBlob, Operation};
use crate::entities::from_epoch_ms;
use crate::errors::{Result, StoreError};
use crate::store::LifecycleFlag;

const COLUMNS: &str = "event_id, hlc_timestamp, wall_timestamp, node_id, table_name, record_id,
     operation, action, user_id, request_ref, client_ip, old_values, new_values, metadata,
     synced_at, consumed_at";

/// Change-event repository over any `Queryable`.
pub struct ChangeEventRepo;

impl ChangeEventRepo {
    /// Insert a new event row.
    pub fn insert<Q: Queryable>(conn: &mut Q, p: &ChangeEventParams) -> Result<()> {
        let json = |blob: &Option<JsonBlob>| Value::from(blob.as_ref().map(JsonBlob::as_str));
        conn.exec_drop(
            "INSERT INTO change_events (event_id, hlc_timestamp, wall_timestamp, node_id,
                 table_name, record_id, operation, action, user_id, request_ref, client_ip,
                 old_values, new_values, metadata)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            Params::Positional(vec![
                Value::from(p.event_id.as_str()),
                Value::from(p.hlc_timestamp.to_i64()),
                Value::from(to_epoch_ms(p.wall_timestamp)),
                Value::from(p.node_id.as_str()),
                Value::from(p.table_name.as_str()),
                Value::from(p.record_id.as_str()),
                Value::from(p.operation.as_str()),
                Value::from(p.action.as_str()),
                Value::from(p.user_id.as_deref()),
                Value::from(p.request_id.as_deref()),
                Value::from(p.ip.as_deref()),
                json(&p.old_values),
                json(&p.new_values),
                json(&p.metadata),
            ]),
        )?;
        Ok(())
    }

    /// Get an event by ID.
    pub fn get_by_id<Q: Queryable>(conn: &mut Q, id: &EventId) -> Result<Option<ChangeEvent>> {
        conn.exec_first::<Row, _, _>(
            format!("SELECT {COLUMNS} FROM change_events WHERE event_id = ?"),
            (id.as_str(),),
        )?
        .map(Self::map_row)
        .transpose()
    }

    /// All events for one record, HLC ascending.
    pub fn get_by_record<Q: Queryable>(
        conn: &mut Q,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        conn.exec::<Row, _, _>(
            format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE table_name = ? AND record_id = ?
                 ORDER BY hlc_timestamp ASC, event_id ASC"
            ),
            (table_name, record_id.as_str()),
        )?
        .into_iter()
        .map(Self::map_row)
        .collect()
    }

    /// Page through all events, HLC descending.
    pub fn list<Q: Queryable>(conn: &mut Q, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        conn.exec::<Row, _, _>(
            format!(
                "SELECT {COLUMNS} FROM change_events
                 ORDER BY hlc_timestamp DESC, event_id DESC
                 LIMIT ? OFFSET ?"
            ),
            (limit, offset),
        )?
        .into_iter()
        .map(Self::map_row)
        .collect()
    }

    /// Count all events.
    pub fn count<Q: Queryable>(conn: &mut Q) -> Result<u64> {
        let count: Option<u64> = conn.query_first("SELECT COUNT(*) FROM change_events")?;
        Ok(count.unwrap_or(0))
    }

    /// Events whose `flag` is unset, HLC ascending.
    pub fn get_unmarked<Q: Queryable>(
        conn: &mut Q,
        flag: LifecycleFlag,
        limit: u32,
    ) -> Result<Vec<ChangeEvent>> {
        conn.exec::<Row, _, _>(
            format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE {} IS NULL
                 ORDER BY hlc_timestamp ASC, event_id ASC
                 LIMIT ?",
                flag.column()
            ),
            (limit,),
        )?
        .into_iter()
        .map(Self::map_row)
        .collect()
    }

    /// Events with HLC strictly after `after`, HLC ascending.
    pub fn get_since<Q: Queryable>(conn: &mut Q, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>> {
        conn.exec::<Row, _, _>(
            format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE hlc_timestamp > ?
                 ORDER BY hlc_timestamp ASC, event_id ASC
                 LIMIT ?"
            ),
            (after.to_i64(), limit),
        )?
        .into_iter()
        .map(Self::map_row)
        .collect()
    }

    /// Set `flag` to `at` if it is unset. Returns whether this call set it.
    pub fn mark<Q: Queryable>(
        conn: &mut Q,
        id: &EventId,
        flag: LifecycleFlag,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = conn
            .exec_iter(
                format!(
                    "UPDATE change_events SET {col} = ? WHERE event_id = ? AND {col} IS NULL",
                    col = flag.column()
                ),
                (to_epoch_ms(at), id.as_str()),
            )?
            .affected_rows();
        if changed > 0 {
            return Ok(true);
        }
        if Self::exists(conn, id)? {
            Ok(false)
        } else {
            Err(StoreError::event_not_found(id.as_str()))
        }
    }

    /// Hard-delete an event. Returns whether a row was removed.
    pub fn delete<Q: Queryable>(conn: &mut Q, id: &EventId) -> Result<bool> {
        let changed = conn
            .exec_iter("DELETE FROM change_events WHERE event_id = ?", (id.as_str(),))?
            .affected_rows();
        Ok(changed > 0)
    }

    /// Whether an event with `id` exists.
    pub fn exists<Q: Queryable>(conn: &mut Q, id: &EventId) -> Result<bool> {
        let found: Option<i32> = conn.exec_first(
            "SELECT 1 FROM change_events WHERE event_id = ?",
            (id.as_str(),),
        )?;
        Ok(found.is_some())
    }

    fn map_row(mut row: Row) -> Result<ChangeEvent> {
        let operation: String = take(&mut row, "operation")?;
        let synced_at: Option<i64> = take(&mut row, "synced_at")?;
        let consumed_at: Option<i64> = take(&mut row, "consumed_at")?;
        Ok(ChangeEvent {
            event_id: EventId::from_string(take(&mut row, "event_id")?),
            hlc_timestamp: Hlc::from_i64(take(&mut row, "hlc_timestamp")?),
            wall_timestamp: from_epoch_ms(take(&mut row, "wall_timestamp")?, "wall_timestamp")?,
            node_id: NodeId::from_string(take(&mut row, "node_id")?),
            table_name: take(&mut row, "table_name")?,
            record_id: RecordId::from_string(take(&mut row, "record_id")?),
            operation: operation.parse::<Operation>()?,
            action: Action::from(take::<String>(&mut row, "action")?),
            user_id: take::<Option<String>>(&mut row, "user_id")?.map(UserId::from_string),
            request_id: take(&mut row, "request_ref")?,
            ip: take(&mut row, "client_ip")?,
            old_values: take::<Option<String>>(&mut row, "old_values")?.map(JsonBlob::from_raw),
            new_values: take::<Option<String>>(&mut row, "new_values")?.map(JsonBlob::from_raw),
            metadata: take::<Option<String>>(&mut row, "metadata")?.map(JsonBlob::from_raw),
            synced_at: synced_at
                .map(|ms| from_epoch_ms(ms, "synced_at"))
                .transpose()?,
            consumed_at: consumed_at
                .map(|ms| from_epoch_ms(ms, "consumed_at"))
                .transpose()?,
        })
    }
}
