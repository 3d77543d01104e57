//! Change-event repository for the `change_events` table.

use ::postgres::{GenericClient, Row};
use chrono::{DateTime, Utc};
use folio_core::time::truncate_ms;
use folio_core::{EventId, Hlc, NodeId, RecordId, UserId};

use crate::change_event::{Action, ChangeEvent, ChangeEventParams, JsonBlob, Operation};
use crate::errors::{Result, StoreError};
use crate::store::LifecycleFlag;

const COLUMNS: &str = "event_id, hlc_timestamp, wall_timestamp, node_id, table_name, record_id,
     operation, action, user_id, request_id, ip, old_values, new_values, metadata,
     synced_at, consumed_at";

/// Change-event repository over any `GenericClient`.
pub struct ChangeEventRepo;

impl ChangeEventRepo {
    /// Insert a new event row.
    pub fn insert<C: GenericClient>(client: &mut C, p: &ChangeEventParams) -> Result<()> {
        let _ = client.execute(
            "INSERT INTO change_events (event_id, hlc_timestamp, wall_timestamp, node_id,
                 table_name, record_id, operation, action, user_id, request_id, ip,
                 old_values, new_values, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            &[
                &p.event_id.as_str(),
                &p.hlc_timestamp.to_i64(),
                &truncate_ms(p.wall_timestamp),
                &p.node_id.as_str(),
                &p.table_name,
                &p.record_id.as_str(),
                &p.operation.as_str(),
                &p.action.as_str(),
                &p.user_id.as_deref(),
                &p.request_id,
                &p.ip,
                &p.old_values.as_ref().map(JsonBlob::as_str),
                &p.new_values.as_ref().map(JsonBlob::as_str),
                &p.metadata.as_ref().map(JsonBlob::as_str),
            ],
        )?;
        Ok(())
    }

    /// Get an event by ID.
    pub fn get_by_id<C: GenericClient>(client: &mut C, id: &EventId) -> Result<Option<ChangeEvent>> {
        client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM change_events WHERE event_id = $1"),
                &[&id.as_str()],
            )?
            .as_ref()
            .map(Self::map_row)
            .transpose()
    }

    /// All events for one record, HLC ascending.
    pub fn get_by_record<C: GenericClient>(
        client: &mut C,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        let rows = client.query(
            &format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE table_name = $1 AND record_id = $2
                 ORDER BY hlc_timestamp ASC, event_id ASC"
            ),
            &[&table_name, &record_id.as_str()],
        )?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Page through all events, HLC descending.
    pub fn list<C: GenericClient>(client: &mut C, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        let rows = client.query(
            &format!(
                "SELECT {COLUMNS} FROM change_events
                 ORDER BY hlc_timestamp DESC, event_id DESC
                 LIMIT $1 OFFSET $2"
            ),
            &[&i64::from(limit), &i64::from(offset)],
        )?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Count all events.
    pub fn count<C: GenericClient>(client: &mut C) -> Result<u64> {
        let count: i64 = client
            .query_one("SELECT COUNT(*) FROM change_events", &[])?
            .try_get(0)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Events whose `flag` is unset, HLC ascending.
    pub fn get_unmarked<C: GenericClient>(
        client: &mut C,
        flag: LifecycleFlag,
        limit: u32,
    ) -> Result<Vec<ChangeEvent>> {
        let rows = client.query(
            &format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE {} IS NULL
                 ORDER BY hlc_timestamp ASC, event_id ASC
                 LIMIT $1",
                flag.column()
            ),
            &[&i64::from(limit)],
        )?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Events with HLC strictly after `after`, HLC ascending.
    pub fn get_since<C: GenericClient>(
        client: &mut C,
        after: Hlc,
        limit: u32,
    ) -> Result<Vec<ChangeEvent>> {
        let rows = client.query(
            &format!(
                "SELECT {COLUMNS} FROM change_events
                 WHERE hlc_timestamp > $1
                 ORDER BY hlc_timestamp ASC, event_id ASC
                 LIMIT $2"
            ),
            &[&after.to_i64(), &i64::from(limit)],
        )?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Set `flag` to `at` if it is unset. Returns whether this call set it.
    pub fn mark<C: GenericClient>(
        client: &mut C,
        id: &EventId,
        flag: LifecycleFlag,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = client.execute(
            &format!(
                "UPDATE change_events SET {col} = $1 WHERE event_id = $2 AND {col} IS NULL",
                col = flag.column()
            ),
            &[&at, &id.as_str()],
        )?;
        if changed > 0 {
            return Ok(true);
        }
        if Self::exists(client, id)? {
            Ok(false)
        } else {
            Err(StoreError::event_not_found(id.as_str()))
        }
    }

    /// Hard-delete an event. Returns whether a row was removed.
    pub fn delete<C: GenericClient>(client: &mut C, id: &EventId) -> Result<bool> {
        let changed = client.execute(
            "DELETE FROM change_events WHERE event_id = $1",
            &[&id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Whether an event with `id` exists.
    pub fn exists<C: GenericClient>(client: &mut C, id: &EventId) -> Result<bool> {
        let row = client.query_opt(
            "SELECT 1 FROM change_events WHERE event_id = $1",
            &[&id.as_str()],
        )?;
        Ok(row.is_some())
    }

    fn map_row(row: &Row) -> Result<ChangeEvent> {
        let operation: String = row.try_get(6)?;
        Ok(ChangeEvent {
            event_id: EventId::from_string(row.try_get(0)?),
            hlc_timestamp: Hlc::from_i64(row.try_get(1)?),
            wall_timestamp: row.try_get(2)?,
            node_id: NodeId::from_string(row.try_get(3)?),
            table_name: row.try_get(4)?,
            record_id: RecordId::from_string(row.try_get(5)?),
            operation: operation.parse::<Operation>()?,
            action: Action::from(row.try_get::<_, String>(7)?),
            user_id: row.try_get::<_, Option<String>>(8)?.map(UserId::from_string),
            request_id: row.try_get(9)?,
            ip: row.try_get(10)?,
            old_values: row.try_get::<_, Option<String>>(11)?.map(JsonBlob::from_raw),
            new_values: row.try_get::<_, Option<String>>(12)?.map(JsonBlob::from_raw),
            metadata: row.try_get::<_, Option<String>>(13)?.map(JsonBlob::from_raw),
            synced_at: row.try_get(14)?,
            consumed_at: row.try_get(15)?,
        })
    }
}
