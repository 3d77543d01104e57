//! Schema migration runner for the `PostgreSQL` backend.
//!
//! Same contract as the `SQLite` runner: embedded SQL, applied in version
//! order, one transaction per migration, tracked in `schema_version`.
//! PostgreSQL DDL is transactional, so a failed migration leaves no trace.

use ::postgres::GenericClient;
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Change-event log and polling indexes",
        sql: include_str!("v001_change_events.sql"),
    },
    Migration {
        version: 2,
        description: "Entity tables: users, content_data",
        sql: include_str!("v002_entities.sql"),
    },
];

/// Arbitrary key for the advisory lock serializing concurrent migrators.
const MIGRATION_LOCK_KEY: i64 = 0x666f_6c69_6f00;

/// Run all pending migrations. Returns the number applied.
pub fn run_migrations<C: GenericClient>(client: &mut C) -> Result<u32> {
    ensure_version_table(client)?;
    let current = current_version(client)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(version = migration.version, "migration already applied, skipping");
            continue;
        }
        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        if apply_migration(client, migration)? {
            applied += 1;
        }
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }
    Ok(applied)
}

/// Return the highest applied migration version, or 0 if none.
pub fn current_version<C: GenericClient>(client: &mut C) -> Result<u32> {
    let version: i32 = client
        .query_one("SELECT COALESCE(MAX(version), 0) FROM schema_version", &[])
        .and_then(|row| row.try_get(0))
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?;
    u32::try_from(version).map_err(|_| StoreError::Migration {
        message: format!("negative schema version {version}"),
    })
}

/// Return the latest migration version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_version_table<C: GenericClient>(client: &mut C) -> Result<()> {
    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
               version     INTEGER     PRIMARY KEY,
               applied_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
               description TEXT
             );",
        )
        .map_err(|e| StoreError::Migration {
            message: format!("failed to create schema_version table: {e}"),
        })
}

/// Apply one migration. Returns `false` if another process applied it
/// while this one waited for the lock.
fn apply_migration<C: GenericClient>(client: &mut C, migration: &Migration) -> Result<bool> {
    let fail = |step: &str, e: ::postgres::Error| StoreError::Migration {
        message: format!("migration v{} ({}) {step}: {e}", migration.version, migration.description),
    };
    let version = i32::try_from(migration.version).map_err(|_| StoreError::Migration {
        message: format!("migration version {} out of range", migration.version),
    })?;

    let mut tx = client.transaction().map_err(|e| fail("begin failed", e))?;
    let _ = tx
        .execute("SELECT pg_advisory_xact_lock($1)", &[&MIGRATION_LOCK_KEY])
        .map_err(|e| fail("lock failed", e))?;
    let already = tx
        .query_opt("SELECT 1 FROM schema_version WHERE version = $1", &[&version])
        .map_err(|e| fail("version check failed", e))?
        .is_some();
    if already {
        tx.commit().map_err(|e| fail("commit failed", e))?;
        return Ok(false);
    }

    tx.batch_execute(migration.sql).map_err(|e| fail("failed", e))?;
    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, description) VALUES ($1, $2)",
            &[&version, &migration.description],
        )
        .map_err(|e| fail("record failed", e))?;
    tx.commit().map_err(|e| fail("commit failed", e))?;
    Ok(true)
}
