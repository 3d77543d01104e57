//! `SQLite` connection pooling.
//!
//! An `r2d2` pool over `r2d2_sqlite`. Every connection the pool opens runs the
//! pragma script first: WAL journal, foreign keys, `busy_timeout`, page
//! cache size and `synchronous = NORMAL`.

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::backend::ConnectionConfig;
use crate::errors::Result;

/// Pool of `SQLite` connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Clone, Copy)]
struct Pragmas {
    busy_timeout_ms: u32,
    cache_size_kib: i64,
}

impl Pragmas {
    fn script(self) -> String {
        format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = {busy};
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -{cache};
             PRAGMA synchronous = NORMAL;",
            busy = self.busy_timeout_ms,
            cache = self.cache_size_kib,
        )
    }
}

impl CustomizeConnection<Connection, rusqlite::Error> for Pragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&self.script())
    }
}

fn build(
    manager: SqliteConnectionManager,
    config: &ConnectionConfig,
    max_size: u32,
) -> Result<ConnectionPool> {
    let pragmas = Pragmas {
        busy_timeout_ms: config.busy_timeout_ms,
        cache_size_kib: config.cache_size_kib,
    };
    Ok(Pool::builder()
        .max_size(max_size)
        .connection_timeout(config.connection_timeout)
        .connection_customizer(Box::new(pragmas))
        .build(manager)?)
}

/// Pool over a private in-memory database.
///
/// `:memory:` connections never share state, so the pool holds exactly one
/// connection whatever `config.pool_size` says.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::memory(), config, 1)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::file(path), config, config.pool_size)
}

/// Pragmas read back from a live connection.
#[derive(Debug)]
pub struct PragmaState {
    /// `wal` for files, `memory` for in-memory databases.
    pub journal_mode: String,
    /// `PRAGMA foreign_keys`.
    pub foreign_keys_enabled: bool,
    /// `PRAGMA busy_timeout`, in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Read the connection's pragmas, for checking what the pool applied.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let pragma = |name: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
    };
    let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: pragma("foreign_keys")? == 1,
        busy_timeout_ms: u32::try_from(pragma("busy_timeout")?).unwrap_or(u32::MAX),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
