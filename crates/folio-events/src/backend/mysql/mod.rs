//! `MySQL` backend (feature `mysql`).
//!
//! Uses the synchronous `mysql` driver and its built-in pool. Differences
//! from the other backends live entirely in this module:
//!
//! - timestamps are stored as epoch-millisecond `BIGINT`s
//! - the provenance columns are named `request_ref` and `client_ip`
//! - DDL is not transactional, so migrations are written to be re-runnable
//!
//! Connections are opened with `CLIENT_FOUND_ROWS` so that an `UPDATE`
//! reports matched rows, not changed rows; an update that rewrites identical
//! values still counts as one row.

pub mod entities;
pub mod migrations;
pub mod recorder;
pub mod repositories;

use std::sync::Arc;

use ::mysql::consts::CapabilityFlags;
use ::mysql::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, PooledConn, Transaction, TxOpts};
use folio_core::{BackendKind, EventId, Hlc, HybridLogicalClock, RecordId};
use folio_settings::DatabaseSettings;
use tracing::{debug, info};

pub use migrations::{current_version, latest_version, run_migrations};
pub use recorder::MySqlRecorder;

use self::repositories::ChangeEventRepo;
use super::{Backend, ConnectionConfig, Database, Transactional, TxHandle, ensure_backend};
use crate::change_event::{ChangeEvent, ChangeEventParams};
use crate::errors::{Result, StoreError};
use crate::recorder::ChangeEventRecorder;
use crate::store::{ChangeEventLog, LifecycleFlag};

/// Marker for the `MySQL` backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySql;

impl Backend for MySql {
    const KIND: BackendKind = BackendKind::MySql;
    type Pool = Pool;
    type Conn = PooledConn;

    fn checkout(pool: &Pool) -> Result<PooledConn> {
        Ok(pool.get_conn()?)
    }
}

impl Transactional for PooledConn {
    type Tx<'c> = Transaction<'c>;

    fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self.start_transaction(TxOpts::default())?)
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

/// Driver options for `url`: the pool bounds from `config` plus
/// `CLIENT_FOUND_ROWS`.
pub fn connect_opts(url: &str, config: &ConnectionConfig) -> Result<Opts> {
    let opts = Opts::from_url(url).map_err(|e| StoreError::MySql(e.into()))?;
    let constraints = PoolConstraints::new(0, config.pool_size as usize).ok_or_else(|| {
        StoreError::InvalidOperation(format!("invalid pool size {}", config.pool_size))
    })?;
    let builder = OptsBuilder::from_opts(opts)
        .additional_capabilities(CapabilityFlags::CLIENT_FOUND_ROWS)
        .pool_opts(PoolOpts::default().with_constraints(constraints));
    Ok(Opts::from(builder))
}

/// Build a pool for a `mysql://` URL.
pub fn connect(url: &str, config: &ConnectionConfig) -> Result<Pool> {
    Ok(Pool::new(connect_opts(url, config)?)?)
}

impl Database<MySql> {
    /// Wrap an existing pool, running pending migrations first.
    pub fn from_pool(pool: Pool) -> Result<Self> {
        {
            let mut conn = pool.get_conn()?;
            let applied = run_migrations(&mut conn)?;
            info!(applied, version = current_version(&mut conn)?, "mysql schema ready");
        }
        let recorder: Arc<dyn ChangeEventRecorder<MySql>> = Arc::new(MySqlRecorder);
        Ok(Self::from_parts(
            pool,
            recorder,
            Arc::new(HybridLogicalClock::new()),
        ))
    }

    /// Connect to `url` and migrate.
    pub fn open(url: &str, config: &ConnectionConfig) -> Result<Self> {
        info!(pool_size = config.pool_size, "opening mysql database");
        Self::from_pool(connect(url, config)?)
    }

    /// Open the database described by `settings`.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        ensure_backend(settings, BackendKind::MySql)?;
        Self::open(&settings.url, &ConnectionConfig::from(settings))
    }

    fn mark(&self, id: &EventId, flag: LifecycleFlag) -> Result<()> {
        let mut conn = self.conn()?;
        let newly = ChangeEventRepo::mark(&mut conn, id, flag, folio_core::time::now_ms())?;
        debug!(event_id = %id, ?flag, newly, "event marked");
        Ok(())
    }
}

impl ChangeEventLog for Database<MySql> {
    fn record_change_event(&self, params: &ChangeEventParams) -> Result<ChangeEvent> {
        let mut conn = self.conn()?;
        ChangeEventRepo::insert(&mut conn, params)?;
        Ok(ChangeEvent::from(params.clone()))
    }

    fn get_change_event(&self, id: &EventId) -> Result<ChangeEvent> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_by_id(&mut conn, id)?
            .ok_or_else(|| StoreError::event_not_found(id.as_str()))
    }

    fn get_change_events_by_record(
        &self,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_by_record(&mut conn, table_name, record_id)
    }

    fn list_change_events(&self, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::list(&mut conn, limit, offset)
    }

    fn count_change_events(&self) -> Result<u64> {
        let mut conn = self.conn()?;
        ChangeEventRepo::count(&mut conn)
    }

    fn get_unsynced_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&mut conn, LifecycleFlag::Synced, limit)
    }

    fn get_unconsumed_events(&self, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_unmarked(&mut conn, LifecycleFlag::Consumed, limit)
    }

    fn get_events_since(&self, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>> {
        let mut conn = self.conn()?;
        ChangeEventRepo::get_since(&mut conn, after, limit)
    }

    fn mark_event_synced(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Synced)
    }

    fn mark_event_consumed(&self, id: &EventId) -> Result<()> {
        self.mark(id, LifecycleFlag::Consumed)
    }

    fn delete_change_event(&self, id: &EventId) -> Result<()> {
        let mut conn = self.conn()?;
        if ChangeEventRepo::delete(&mut conn, id)? {
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

/// Server-backed tests run only when `FOLIO_TEST_MYSQL_URL` is set.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audited::{CreateEntity, UpdateEntity, create, update};
    use crate::change_event::{Action, JsonBlob, Operation};
    use crate::entities::{CreateUserParams, UpdateUserParams, User};
    use folio_core::{AuditContext, NodeId, UserId};
    use tokio_util::sync::CancellationToken;

    fn setup() -> Option<Database<MySql>> {
        let url = std::env::var("FOLIO_TEST_MYSQL_URL").ok()?;
        let config = ConnectionConfig {
            pool_size: 2,
            ..ConnectionConfig::default()
        };
        Some(Database::<MySql>::open(&url, &config).unwrap())
    }

    #[test]
    fn url_without_scheme_is_rejected() {
        assert!(connect("localhost:3306/folio", &ConnectionConfig::default()).is_err());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let config = ConnectionConfig {
            pool_size: 0,
            ..ConnectionConfig::default()
        };
        assert!(matches!(
            connect("mysql://root@localhost/folio", &config),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn connections_report_matched_rows() {
        let opts = connect_opts("mysql://root@localhost/folio", &ConnectionConfig::default()).unwrap();
        assert!(
            opts.get_additional_capabilities()
                .contains(CapabilityFlags::CLIENT_FOUND_ROWS)
        );
    }

    #[test]
    fn update_with_unchanged_values_succeeds() {
        let Some(db) = setup() else { return };
        let ctx = AuditContext::system(NodeId::from("mysql-test"));
        let cancel = CancellationToken::new();
        let name = format!("same-{}", RecordId::new().as_str().to_lowercase());
        let user = create(
            &CreateEntity::<MySql, User>::new(
                &db,
                &ctx,
                CreateUserParams {
                    username: name.clone(),
                    email: format!("{name}@example.com"),
                    role: 1,
                },
            ),
            &cancel,
        )
        .unwrap();

        let same = UpdateUserParams {
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        };
        update(
            &UpdateEntity::<MySql, User>::new(&db, &ctx, user.user_id.clone(), same),
            &cancel,
        )
        .unwrap();
        assert_eq!(
            db.get_change_events_by_record("users", &user.user_id).unwrap().len(),
            2
        );
    }

    #[test]
    fn wall_time_reads_back_as_recorded() {
        let Some(db) = setup() else { return };
        let mut p = ChangeEventParams::new(
            &AuditContext::system(NodeId::from("mysql-test")),
            db.clock().now(),
            "users",
            RecordId::new(),
            Operation::Insert,
        );
        p.wall_timestamp = chrono::Utc::now();
        let recorded = db.record_change_event(&p).unwrap();
        assert_eq!(db.get_change_event(&p.event_id).unwrap(), recorded);
        db.delete_change_event(&p.event_id).unwrap();
    }

    #[test]
    fn provenance_round_trips_through_renamed_columns() {
        let Some(db) = setup() else { return };
        let p = ChangeEventParams {
            event_id: EventId::new(),
            hlc_timestamp: db.clock().now(),
            wall_timestamp: folio_core::time::now_ms(),
            node_id: NodeId::from("mysql-test"),
            table_name: "users".into(),
            record_id: RecordId::new(),
            operation: Operation::Delete,
            action: Action::Delete,
            user_id: Some(UserId::new()),
            request_id: Some("req-42".into()),
            ip: Some("10.0.0.7".into()),
            old_values: Some(JsonBlob::from_raw(r#"{"username":"ada"}"#.into())),
            new_values: None,
            metadata: None,
        };
        let _ = db.record_change_event(&p).unwrap();
        let fetched = db.get_change_event(&p.event_id).unwrap();
        assert_eq!(fetched, ChangeEvent::from(p.clone()));

        db.mark_event_consumed(&p.event_id).unwrap();
        assert!(db.get_change_event(&p.event_id).unwrap().is_consumed());
        db.delete_change_event(&p.event_id).unwrap();
    }
}
