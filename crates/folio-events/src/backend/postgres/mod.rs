//! `PostgreSQL` backend (feature `postgres`).
//!
//! Synchronous `postgres` client pooled through `r2d2_postgres`. Repositories
//! are generic over [`postgres::GenericClient`], so they serve both pooled
//! connections and the orchestrator's transactions.

pub mod entities;
pub mod migrations;
pub mod recorder;
pub mod repositories;

use std::sync::Arc;

use ::postgres::{NoTls, Transaction};
use folio_core::{BackendKind, EventId, Hlc, HybridLogicalClock, RecordId};
use folio_settings::DatabaseSettings;
use r2d2_postgres::PostgresConnectionManager;
use tracing::{debug, info};

pub use migrations::{current_version, latest_version, run_migrations};
pub use recorder::PostgresRecorder;

use self::repositories::ChangeEventRepo;
use super::{Backend, ConnectionConfig, Database, Transactional, TxHandle, ensure_backend};
use crate::change_event::{ChangeEvent, ChangeEventParams};
use crate::errors::{Result, StoreError};
use crate::recorder::ChangeEventRecorder;
use crate::store::{ChangeEventLog, LifecycleFlag};

/// Connection pool type.
pub type ConnectionPool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

/// A pooled connection.
pub type PooledConnection = r2d2::PooledConnection<PostgresConnectionManager<NoTls>>;

/// Marker for the `PostgreSQL` backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Postgres;

impl Backend for Postgres {
    const KIND: BackendKind = BackendKind::Postgres;
    type Pool = ConnectionPool;
    type Conn = PooledConnection;

    fn checkout(pool: &ConnectionPool) -> Result<PooledConnection> {
        Ok(pool.get()?)
    }
}

impl Transactional for PooledConnection {
    type Tx<'c> = Transaction<'c>;

    fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self.transaction()?)
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

/// Build a pool for a `postgres://` URL.
pub fn connect(url: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pg_config = url
        .parse::<::postgres::Config>()
        .map_err(StoreError::Postgres)?;
    let manager = PostgresConnectionManager::new(pg_config, NoTls);
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connection_timeout)
        .build(manager)?;
    Ok(pool)
}

impl Database<Postgres> {
    /// Wrap an existing pool, running pending migrations first.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        {
            let mut conn = pool.get()?;
            let applied = run_migrations(&mut *conn)?;
            info!(applied, version = current_version(&mut *conn)?, "postgres schema ready");
        }
        let recorder: Arc<dyn ChangeEventRecorder<Postgres>> = Arc::new(PostgresRecorder);
        Ok(Self::from_parts(
            pool,
            recorder,
            Arc::new(HybridLogicalClock::new()),
        ))
    }

    /// Connect to `url` and migrate.
    pub fn open(url: &str, config: &ConnectionConfig) -> Result<Self> {
        info!(pool_size = config.pool_size, "opening postgres database");
        Self::from_pool(connect(url, config)?)
    }

    /// Open the database described by `settings`.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        ensure_backend(settings, BackendKind::Postgres)?;
        Self::open(&settings.url, &ConnectionConfig::from(settings))
    }

    fn mark(&self, id: &EventId, flag: LifecycleFlag) -> Result<()> {
        let mut conn = self.conn()?;
        let newly = ChangeEventRepo::mark(&mut *conn, id, flag, folio_core::time::now_ms())?;
        debug!(event_id = %id, ?flag, newly, "event marked");
        Ok(())
    }
}

impl ChangeEventLog for Database<Postgres> {
    fn record_change_event(&self, params: &ChangeEventParams) -> Result<ChangeEvent> {
        let mut conn = self.conn()?;
        ChangeEventRepo::insert(&mut *conn, params)?;
        Ok(ChangeEvent::from(params.clone()))
    }

    fn get_change_event(&self, id: &EventId) -> Result<ChangeEvent> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_by_id(&mut *conn, id)?
            .ok_or_else(|| StoreError::event_not_found(id.as_str()))
    }

    fn get_change_events_by_record(
        &self,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_by_record(&mut *conn, table_name, record_id)
    }

    fn list_change_events(&self, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::list(&mut *conn, limit, offset)
    }

    fn count_change_events(&self) -> Result<u64> {
        let mut conn = self.conn()?;
        ChangeEventRepo::count(&mut *conn)
    }

    fn get_unsynced_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&mut *conn, LifecycleFlag::Synced, limit)
    }

    fn get_unconsumed_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&mut *conn, LifecycleFlag::Consumed, limit)
    }

    fn get_events_since(&self, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_since(&mut *conn, after, limit)
    }

    fn mark_event_synced(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Synced)
    }

    fn mark_event_consumed(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Consumed)
    }

    fn delete_change_event(&self, id: &EventId) -> Result<()> {
        let mut conn = self.conn()?;
        if ChangeEventRepo::delete(&mut *conn, id)? {
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

/// These need a live server: set `FOLIO_TEST_POSTGRES_URL` to run them.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_event::{Action, JsonBlob, Operation};
    use folio_core::NodeId;

    fn setup() -> Option<Database<Postgres>> {
        let url = std::env::var("FOLIO_TEST_POSTGRES_URL").ok()?;
        let config = ConnectionConfig {
            pool_size: 2,
            ..ConnectionConfig::default()
        };
        Some(Database::<Postgres>::open(&url, &config).unwrap())
    }

    fn params(hlc: Hlc) -> ChangeEventParams {
        ChangeEventParams {
            event_id: EventId::new(),
            hlc_timestamp: hlc,
            wall_timestamp: folio_core::time::now_ms(),
            node_id: NodeId::from("pg-test"),
            table_name: "users".into(),
            record_id: RecordId::new(),
            operation: Operation::Insert,
            action: Action::Create,
            user_id: None,
            request_id: None,
            ip: None,
            old_values: None,
            new_values: Some(JsonBlob::from_raw(r#"{"username":"ada"}"#.into())),
            metadata: None,
        }
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(connect("not a url ===", &ConnectionConfig::default()).is_err());
    }

    #[test]
    fn settings_for_other_backend_are_rejected() {
        let settings = DatabaseSettings::default();
        assert!(matches!(
            Database::<Postgres>::from_settings(&settings),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn record_get_mark_delete() {
        let Some(db) = setup() else { return };
        let p = params(db.clock().now());
        let _ = db.record_change_event(&p).unwrap();

        let fetched = db.get_change_event(&p.event_id).unwrap();
        assert_eq!(fetched, ChangeEvent::from(p.clone()));

        db.mark_event_synced(&p.event_id).unwrap();
        let first = db.get_change_event(&p.event_id).unwrap().synced_at;
        db.mark_event_synced(&p.event_id).unwrap();
        assert_eq!(db.get_change_event(&p.event_id).unwrap().synced_at, first);

        db.delete_change_event(&p.event_id).unwrap();
        assert!(db.get_change_event(&p.event_id).unwrap_err().is_not_found());
    }

    #[test]
    fn migrations_are_idempotent() {
        let Some(db) = setup() else { return };
        let mut conn = db.conn().unwrap();
        assert_eq!(run_migrations(&mut *conn).unwrap(), 0);
        assert_eq!(current_version(&mut *conn).unwrap(), latest_version());
    }

    #[test]
    fn sub_millisecond_wall_time_reads_back_as_recorded() {
        let Some(db) = setup() else { return };
        let mut p = params(db.clock().now());
        p.wall_timestamp = chrono::DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        p.action = Action::from("create");
        let recorded = db.record_change_event(&p).unwrap();
        assert_eq!(db.get_change_event(&p.event_id).unwrap(), recorded);
        db.delete_change_event(&p.event_id).unwrap();
    }
}
