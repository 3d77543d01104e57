//! Change-event repository for the `change_events` table.
//!
//! Rows are append-only: the only in-place writes are the two lifecycle
//! flags, and each is set at most once (`... AND synced_at IS NULL`).

use chrono::{DateTime, Utc};
use folio_core::time::truncate_ms;
use folio_core::{EventId, Hlc, NodeId, RecordId, UserId};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::change_event::{Action, ChangeEvent, ChangeEventParams, JsonBlob, Operation};
use crate::errors::{Result, StoreError};
use crate::store::LifecycleFlag;

const COLUMNS: &str = "event_id, hlc_timestamp, wall_timestamp, node_id, table_name, record_id,
     operation, action, user_id, request_id, ip, old_values, new_values, metadata,
     synced_at, consumed_at";

/// Change-event repository — stateless, every method takes `&Connection`.
pub struct ChangeEventRepo;

impl ChangeEventRepo {
    /// Insert a new event row.
    pub fn insert(conn: &Connection, p: &ChangeEventParams) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO change_events (event_id, hlc_timestamp, wall_timestamp, node_id,
                 table_name, record_id, operation, action, user_id, request_id, ip,
                 old_values, new_values, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                p.event_id.as_str(),
                p.hlc_timestamp.to_i64(),
                truncate_ms(p.wall_timestamp),
                p.node_id.as_str(),
                p.table_name,
                p.record_id.as_str(),
                p.operation.as_str(),
                p.action.as_str(),
                p.user_id.as_deref(),
                p.request_id,
                p.ip,
                p.old_values.as_ref().map(JsonBlob::as_str),
                p.new_values.as_ref().map(JsonBlob::as_str),
                p.metadata.as_ref().map(JsonBlob::as_str),
            ],
        )?;
        Ok(())
    }

    /// Get an event by ID.
    pub fn get_by_id(conn: &Connection, id: &EventId) -> Result<Option<ChangeEvent>> {
        let event = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM change_events WHERE event_id = ?1"),
                params![id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(event)
    }

    /// All events for one record, HLC ascending.
    pub fn get_by_record(
        conn: &Connection,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM change_events
             WHERE table_name = ?1 AND record_id = ?2
             ORDER BY hlc_timestamp ASC, event_id ASC"
        ))?;
        let rows = stmt
            .query_map(params![table_name, record_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Page through all events, HLC descending.
    pub fn list(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM change_events
             ORDER BY hlc_timestamp DESC, event_id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![limit, offset], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count all events.
    pub fn count(conn: &Connection) -> Result<u64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM change_events", [], |row| {
            row.get(0)
        })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Events whose `flag` is unset, HLC ascending.
    pub fn get_unmarked(
        conn: &Connection,
        flag: LifecycleFlag,
        limit: u32,
    ) -> Result<Vec<ChangeEvent>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM change_events
             WHERE {} IS NULL
             ORDER BY hlc_timestamp ASC, event_id ASC
             LIMIT ?1",
            flag.column()
        ))?;
        let rows = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Events with HLC strictly after `after`, HLC ascending.
    pub fn get_since(conn: &Connection, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM change_events
             WHERE hlc_timestamp > ?1
             ORDER BY hlc_timestamp ASC, event_id ASC
             LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![after.to_i64(), limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Set `flag` to `at` if it is unset.
    ///
    /// Returns whether this call set it. An already-set flag is left alone
    /// and reported as `false`; a missing event is `NotFound`.
    pub fn mark(
        conn: &Connection,
        id: &EventId,
        flag: LifecycleFlag,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let changed = conn.execute(
            &format!(
                "UPDATE change_events SET {col} = ?1 WHERE event_id = ?2 AND {col} IS NULL",
                col = flag.column()
            ),
            params![at, id.as_str()],
        )?;
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
    pub fn delete(conn: &Connection, id: &EventId) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM change_events WHERE event_id = ?1",
            params![id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Whether an event with `id` exists.
    pub fn exists(conn: &Connection, id: &EventId) -> Result<bool> {
        let found: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM change_events WHERE event_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Map a rusqlite row to a `ChangeEvent`.
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChangeEvent> {
        let operation: String = row.get(6)?;
        let operation = operation.parse::<Operation>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
        })?;
        Ok(ChangeEvent {
            event_id: EventId::from_string(row.get(0)?),
            hlc_timestamp: Hlc::from_i64(row.get(1)?),
            wall_timestamp: row.get(2)?,
            node_id: NodeId::from_string(row.get(3)?),
            table_name: row.get(4)?,
            record_id: RecordId::from_string(row.get(5)?),
            operation,
            action: Action::from(row.get::<_, String>(7)?),
            user_id: row.get::<_, Option<String>>(8)?.map(UserId::from_string),
            request_id: row.get(9)?,
            ip: row.get(10)?,
            old_values: row.get::<_, Option<String>>(11)?.map(JsonBlob::from_raw),
            new_values: row.get::<_, Option<String>>(12)?.map(JsonBlob::from_raw),
            metadata: row.get::<_, Option<String>>(13)?.map(JsonBlob::from_raw),
            synced_at: row.get(14)?,
            consumed_at: row.get(15)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::backend::sqlite::migrations::run_migrations;
    use assert_matches::assert_matches;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn params_at(hlc: Hlc, record_id: &RecordId) -> ChangeEventParams {
        ChangeEventParams {
            event_id: EventId::new(),
            hlc_timestamp: hlc,
            wall_timestamp: folio_core::time::now_ms(),
            node_id: NodeId::from("node-1"),
            table_name: "users".into(),
            record_id: record_id.clone(),
            operation: Operation::Update,
            action: Action::Update,
            user_id: Some(UserId::new()),
            request_id: Some("req-1".into()),
            ip: Some("127.0.0.1".into()),
            old_values: Some(JsonBlob::from_raw(r#"{"role":1}"#.into())),
            new_values: Some(JsonBlob::from_raw(r#"{"role":2}"#.into())),
            metadata: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = setup();
        let p = params_at(Hlc::new(1_000, 0), &RecordId::new());
        ChangeEventRepo::insert(&conn, &p).unwrap();

        let event = ChangeEventRepo::get_by_id(&conn, &p.event_id).unwrap().unwrap();
        assert_eq!(event, ChangeEvent::from(p));
    }

    #[test]
    fn insert_stores_wall_time_at_millisecond_precision() {
        let conn = setup();
        let mut p = params_at(Hlc::new(1_000, 0), &RecordId::new());
        p.wall_timestamp = DateTime::from_timestamp(1_700_000_000, 555_666_777).unwrap();
        ChangeEventRepo::insert(&conn, &p).unwrap();

        let event = ChangeEventRepo::get_by_id(&conn, &p.event_id).unwrap().unwrap();
        assert_eq!(event.wall_timestamp.timestamp_subsec_nanos(), 555_000_000);
        assert_eq!(event, ChangeEvent::from(p));
    }

    #[test]
    fn get_missing_is_none() {
        let conn = setup();
        assert!(ChangeEventRepo::get_by_id(&conn, &EventId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_event_id_is_constraint_violation() {
        let conn = setup();
        let p = params_at(Hlc::new(1, 0), &RecordId::new());
        ChangeEventRepo::insert(&conn, &p).unwrap();
        let err = ChangeEventRepo::insert(&conn, &p).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn short_record_id_is_rejected() {
        let conn = setup();
        let p = params_at(Hlc::new(1, 0), &RecordId::from("abc"));
        let err = ChangeEventRepo::insert(&conn, &p).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn by_record_is_hlc_ascending() {
        let conn = setup();
        let record = RecordId::new();
        for hlc in [Hlc::new(30, 0), Hlc::new(10, 0), Hlc::new(20, 5)] {
            ChangeEventRepo::insert(&conn, &params_at(hlc, &record)).unwrap();
        }
        ChangeEventRepo::insert(&conn, &params_at(Hlc::new(15, 0), &RecordId::new())).unwrap();

        let events = ChangeEventRepo::get_by_record(&conn, "users", &record).unwrap();
        let hlcs: Vec<_> = events.iter().map(|e| e.hlc_timestamp).collect();
        assert_eq!(hlcs, vec![Hlc::new(10, 0), Hlc::new(20, 5), Hlc::new(30, 0)]);
    }

    #[test]
    fn list_is_newest_first_with_offset() {
        let conn = setup();
        let record = RecordId::new();
        for ms in 1..=5 {
            ChangeEventRepo::insert(&conn, &params_at(Hlc::new(ms, 0), &record)).unwrap();
        }
        let page = ChangeEventRepo::list(&conn, 2, 1).unwrap();
        let hlcs: Vec<_> = page.iter().map(|e| e.hlc_timestamp).collect();
        assert_eq!(hlcs, vec![Hlc::new(4, 0), Hlc::new(3, 0)]);
        assert_eq!(ChangeEventRepo::count(&conn).unwrap(), 5);
    }

    #[test]
    fn mark_is_idempotent_and_keeps_first_timestamp() {
        let conn = setup();
        let p = params_at(Hlc::new(1, 0), &RecordId::new());
        ChangeEventRepo::insert(&conn, &p).unwrap();

        let first = folio_core::time::now_ms();
        assert!(ChangeEventRepo::mark(&conn, &p.event_id, LifecycleFlag::Synced, first).unwrap());
        let later = first + chrono::Duration::seconds(10);
        assert!(!ChangeEventRepo::mark(&conn, &p.event_id, LifecycleFlag::Synced, later).unwrap());

        let event = ChangeEventRepo::get_by_id(&conn, &p.event_id).unwrap().unwrap();
        assert_eq!(event.synced_at, Some(first));
        assert!(event.consumed_at.is_none());
    }

    #[test]
    fn mark_unknown_is_not_found() {
        let conn = setup();
        let err = ChangeEventRepo::mark(
            &conn,
            &EventId::new(),
            LifecycleFlag::Consumed,
            folio_core::time::now_ms(),
        )
        .unwrap_err();
        assert_matches!(err, StoreError::NotFound { .. });
    }

    #[test]
    fn unmarked_flags_are_independent() {
        let conn = setup();
        let record = RecordId::new();
        let a = params_at(Hlc::new(1, 0), &record);
        let b = params_at(Hlc::new(2, 0), &record);
        ChangeEventRepo::insert(&conn, &a).unwrap();
        ChangeEventRepo::insert(&conn, &b).unwrap();

        let now = folio_core::time::now_ms();
        ChangeEventRepo::mark(&conn, &a.event_id, LifecycleFlag::Synced, now).unwrap();

        let unsynced = ChangeEventRepo::get_unmarked(&conn, LifecycleFlag::Synced, 10).unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].event_id, b.event_id);

        let unconsumed = ChangeEventRepo::get_unmarked(&conn, LifecycleFlag::Consumed, 10).unwrap();
        assert_eq!(unconsumed.len(), 2);
        assert_eq!(unconsumed[0].event_id, a.event_id);
    }

    #[test]
    fn since_is_exclusive() {
        let conn = setup();
        let record = RecordId::new();
        for ms in 1..=4 {
            ChangeEventRepo::insert(&conn, &params_at(Hlc::new(ms, 0), &record)).unwrap();
        }
        let events = ChangeEventRepo::get_since(&conn, Hlc::new(2, 0), 10).unwrap();
        let hlcs: Vec<_> = events.iter().map(|e| e.hlc_timestamp).collect();
        assert_eq!(hlcs, vec![Hlc::new(3, 0), Hlc::new(4, 0)]);
    }

    #[test]
    fn delete_reports_removal() {
        let conn = setup();
        let p = params_at(Hlc::new(1, 0), &RecordId::new());
        ChangeEventRepo::insert(&conn, &p).unwrap();
        assert!(ChangeEventRepo::delete(&conn, &p.event_id).unwrap());
        assert!(!ChangeEventRepo::delete(&conn, &p.event_id).unwrap());
        assert!(!ChangeEventRepo::exists(&conn, &p.event_id).unwrap());
    }
}
