//! `SQLite` backend.
//!
//! - **[`connection`]**: `r2d2` connection pool with WAL mode, foreign keys,
//!   and busy-timeout pragmas applied to every connection.
//! - **[`migrations`]**: version-tracked schema, embedded at compile time.
//! - **[`repositories`]**: stateless repository structs over `&Connection`.
//! - **[`recorder`]**: the [`ChangeEventRecorder`] for this backend.
//!
//! `Database<Sqlite>` implements [`ChangeEventLog`] on top of the change-event
//! repository.

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod recorder;
pub mod repositories;

use std::sync::Arc;

use folio_core::{BackendKind, EventId, Hlc, HybridLogicalClock, RecordId};
use folio_settings::DatabaseSettings;
use rusqlite::{Transaction, TransactionBehavior};
use tracing::info;

pub use connection::{ConnectionPool, PooledConnection, new_file, new_in_memory, verify_pragmas};
pub use migrations::{current_version, latest_version, run_migrations};
pub use recorder::SqliteRecorder;

use self::repositories::ChangeEventRepo;
use super::{Backend, ConnectionConfig, Database, Transactional, TxHandle, ensure_backend};
use crate::change_event::{ChangeEvent, ChangeEventParams};
use crate::errors::{Result, StoreError};
use crate::recorder::ChangeEventRecorder;
use crate::store::{ChangeEventLog, LifecycleFlag};

/// Marker for the `SQLite` backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sqlite;

impl Backend for Sqlite {
    const KIND: BackendKind = BackendKind::Sqlite;
    type Pool = ConnectionPool;
    type Conn = PooledConnection;

    fn checkout(pool: &ConnectionPool) -> Result<PooledConnection> {
        Ok(pool.get()?)
    }
}

/// Transactions take the write lock up front (`BEGIN IMMEDIATE`), waiting
/// on `busy_timeout` for it.
impl Transactional for PooledConnection {
    type Tx<'c> = Transaction<'c>;

    fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self.transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

impl TxHandle for Transaction<'_> {
    fn commit(self) -> Result<()> {
        Ok(Transaction::commit(self)?)
    }

    fn rollback(self) -> Result<()> {
        Ok(Transaction::rollback(self)?)
    }
}

impl Database<Sqlite> {
    /// Wrap an existing pool, running pending migrations first.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        {
            let conn = pool.get()?;
            let applied = run_migrations(&conn)?;
            info!(applied, version = current_version(&conn)?, "sqlite schema ready");
        }
        let recorder: Arc<dyn ChangeEventRecorder<Sqlite>> = Arc::new(SqliteRecorder);
        Ok(Self::from_parts(
            pool,
            recorder,
            Arc::new(HybridLogicalClock::new()),
        ))
    }

    /// Open (or create) a file-backed database.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        info!(path, pool_size = config.pool_size, "opening sqlite database");
        Self::from_pool(new_file(path, config)?)
    }

    /// Open a private in-memory database (single pooled connection).
    pub fn open_in_memory(config: &ConnectionConfig) -> Result<Self> {
        Self::from_pool(new_in_memory(config)?)
    }

    /// Open the database described by `settings`.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        ensure_backend(settings, BackendKind::Sqlite)?;
        Self::open(&settings.url, &ConnectionConfig::from(settings))
    }

    fn mark(&self, id: &EventId, flag: LifecycleFlag) -> Result<()> {
        let conn = self.conn()?;
        let newly = ChangeEventRepo::mark(&conn, id, flag, folio_core::time::now_ms())?;
        tracing::debug!(event_id = %id, ?flag, newly, "event marked");
        Ok(())
    }
}

impl ChangeEventLog for Database<Sqlite> {
    fn record_change_event(&self, params: &ChangeEventParams) -> Result<ChangeEvent> {
        let conn = self.conn()?;
        ChangeEventRepo::insert(&conn, params)?;
        Ok(ChangeEvent::from(params.clone()))
    }

    fn get_change_event(&self, id: &EventId) -> Result<ChangeEvent> {
        let conn = self.conn()?;
        ChangeEventRepo::get_by_id(&conn, id)?
            .ok_or_else(|| StoreError::event_not_found(id.as_str()))
    }

    fn get_change_events_by_record(
        &self,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        ChangeEventRepo::get_by_record(&conn, table_name, record_id)
    }

    fn list_change_events(&self, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        ChangeEventRepo::list(&conn, limit, offset)
    }

    fn count_change_events(&self) -> Result<u64> {
        let conn = self.conn()?;
        ChangeEventRepo::count(&conn)
    }

    fn get_unsynced_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&conn, LifecycleFlag::Synced, limit)
    }

    fn get_unconsumed_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&conn, LifecycleFlag::Consumed, limit)
    }

    fn get_events_since(&self, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>> {
        let conn = self.conn()?;
        ChangeEventRepo::get_since(&conn, after, limit)
    }

    fn mark_event_synced(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Synced)
    }

    fn mark_event_consumed(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Consumed)
    }

    fn delete_change_event(&self, id: &EventId) -> Result<()> {
        let conn = self.conn()?;
        if ChangeEventRepo::delete(&conn, id)? {
            info!(event_id = %id, "change event deleted");
            Ok(())
        } else {
            Err(StoreError::event_not_found(id.as_str()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
