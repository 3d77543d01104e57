//! Schema migration runner for the `MySQL` backend.
//!
//! `MySQL` commits DDL implicitly, so a migration cannot be rolled back as a
//! unit. Every statement is written to be re-runnable (`IF NOT EXISTS`) and
//! the version row is written last: a migration that fails halfway is simply
//! applied again on the next start.

use ::mysql::prelude::Queryable;
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

/// Run all pending migrations. Returns the number applied.
pub fn run_migrations<Q: Queryable>(conn: &mut Q) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
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
        apply_migration(conn, migration)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }
    Ok(applied)
}

/// Return the highest applied migration version, or 0 if none.
pub fn current_version<Q: Queryable>(conn: &mut Q) -> Result<u32> {
    let version: Option<u32> = conn
        .query_first("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?;
    Ok(version.unwrap_or(0))
}

/// Return the latest migration version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Split a migration file into executable statements, dropping comments.
fn statements(sql: &str) -> impl Iterator<Item = String> + '_ {
    sql.split(';').filter_map(|chunk| {
        let body = chunk
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let body = body.trim();
        (!body.is_empty()).then(|| body.to_owned())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_version_table<Q: Queryable>(conn: &mut Q) -> Result<()> {
    conn.query_drop(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version        INT          NOT NULL PRIMARY KEY,
           applied_at_ms  BIGINT       NOT NULL,
           description    VARCHAR(255) NULL
         ) ENGINE = InnoDB DEFAULT CHARSET = utf8mb4",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })
}

fn apply_migration<Q: Queryable>(conn: &mut Q, migration: &Migration) -> Result<()> {
    for (index, statement) in statements(migration.sql).enumerate() {
        conn.query_drop(statement.as_str()).map_err(|e| StoreError::Migration {
            message: format!(
                "migration v{} ({}) statement {} failed: {e}",
                migration.version,
                migration.description,
                index + 1
            ),
        })?;
    }

    conn.exec_drop(
        "INSERT IGNORE INTO schema_version (version, applied_at_ms, description) VALUES (?, ?, ?)",
        (
            migration.version,
            folio_core::time::to_epoch_ms(folio_core::time::now_ms()),
            migration.description,
        ),
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to record v{} in schema_version: {e}", migration.version),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
