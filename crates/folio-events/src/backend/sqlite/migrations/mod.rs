//! Schema migrations for the `SQLite` backend.
//!
//! Each version's SQL is compiled in with [`include_str!`] and applied in its
//! own transaction together with its `schema_version` row, so a failed step
//! leaves the schema at the previous version. Re-running is a no-op.

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

/// `(version, description, sql)`, ascending.
const MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "Change-event log and polling indexes",
        include_str!("v001_change_events.sql"),
    ),
    (
        2,
        "Entity tables: users, content_data",
        include_str!("v002_entities.sql"),
    ),
];

fn migration_error(step: &str, err: &rusqlite::Error) -> StoreError {
    StoreError::Migration {
        message: format!("{step}: {err}"),
    }
}

/// Apply every migration newer than the recorded schema version.
///
/// Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;

    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _, _)| *v > current).collect();
    if pending.is_empty() {
        debug!(version = current, "schema up to date");
        return Ok(0);
    }

    for &&(version, description, sql) in &pending {
        info!(version, description, "applying migration");
        apply_migration(conn, version, description, sql)?;
    }

    let applied = u32::try_from(pending.len()).unwrap_or(u32::MAX);
    info!(applied, from = current, to = latest_version(), "migrations complete");
    Ok(applied)
}

/// Highest applied version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| migration_error("read schema_version", &e))
}

/// Newest version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(v, _, _)| *v)
}

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| migration_error("create schema_version", &e))
}

fn apply_migration(conn: &Connection, version: u32, description: &str, sql: &str) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| migration_error(&format!("begin v{version}"), &e))?;
    tx.execute_batch(sql)
        .map_err(|e| migration_error(&format!("v{version} ({description})"), &e))?;
    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, applied_at, description)
             VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), ?2)",
            params![version, description],
        )
        .map_err(|e| migration_error(&format!("record v{version}"), &e))?;
    tx.commit()
        .map_err(|e| migration_error(&format!("commit v{version}"), &e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn names(conn: &Connection, sql: &str) -> Vec<String> {
        conn.prepare(sql)
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn run_migrations_creates_all_tables() {
        let conn = open_memory();
        let applied = run_migrations(&conn).unwrap();
        assert_eq!(applied, 2);

        let tables = names(
            &conn,
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        );
        for table in ["change_events", "content_data", "schema_version", "users"] {
            assert!(tables.contains(&table.to_string()), "missing table: {table}");
        }
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let conn = open_memory();
        assert_eq!(run_migrations(&conn).unwrap(), 2);
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn current_version_starts_at_zero() {
        let conn = open_memory();
        ensure_version_table(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn current_version_after_migration() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn latest_version_matches_migrations() {
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn polling_indexes_are_created() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let indexes = names(
            &conn,
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
        );
        for idx in [
            "idx_change_events_record",
            "idx_change_events_hlc",
            "idx_change_events_unsynced",
            "idx_change_events_unconsumed",
            "idx_content_data_parent",
        ] {
            assert!(indexes.contains(&idx.to_string()), "missing index: {idx}");
        }
    }

    #[test]
    fn change_events_has_expected_columns() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(change_events)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for col in [
            "event_id",
            "hlc_timestamp",
            "wall_timestamp",
            "node_id",
            "table_name",
            "record_id",
            "operation",
            "action",
            "user_id",
            "request_id",
            "ip",
            "old_values",
            "new_values",
            "metadata",
            "synced_at",
            "consumed_at",
        ] {
            assert!(
                columns.contains(&col.to_string()),
                "change_events missing column: {col}"
            );
        }
    }

    #[test]
    fn record_id_length_is_enforced() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let err = conn
            .execute(
                "INSERT INTO change_events (event_id, hlc_timestamp, wall_timestamp, node_id,
                     table_name, record_id, operation, action)
                 VALUES ('e1', 1, '2025-01-01T00:00:00Z', 'n', 'users', 'short', 'INSERT', 'create')",
                [],
            )
            .unwrap_err();
        assert!(StoreError::from(err).is_constraint_violation());
    }

    #[test]
    fn operation_check_is_enforced() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO change_events (event_id, hlc_timestamp, wall_timestamp, node_id,
                 table_name, record_id, operation, action)
             VALUES ('e1', 1, '2025-01-01T00:00:00Z', 'n', 'users',
                     '01ARZ3NDEKTSV4RRFFQ69G5FAV', 'UPSERT', 'create')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn schema_version_records_descriptions() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        let desc: String = conn
            .query_row(
                "SELECT description FROM schema_version WHERE version = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(desc.contains("users"));
    }
}
