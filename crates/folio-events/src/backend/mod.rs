//! Backend abstraction.
//!
//! Three structurally different SQL drivers sit behind one narrow seam:
//!
//! - **[`Transactional`]**: a pooled connection that can open a transaction.
//! - **[`TxHandle`]**: the open transaction; `commit` or `rollback` consumes
//!   it, and dropping it un-committed rolls back.
//! - **[`Backend`]**: a zero-sized marker naming the pool and connection types
//!   and how to check a connection out of the pool.
//!
//! [`Database`] is the explicit, constructed-once handle that owns a pool,
//! the backend's [`ChangeEventRecorder`] and the node's
//! [`HybridLogicalClock`].

pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use folio_core::{BackendKind, HybridLogicalClock};
use folio_settings::DatabaseSettings;

use crate::errors::{Result, StoreError};
use crate::recorder::ChangeEventRecorder;

/// An open transaction.
pub trait TxHandle {
    /// Commit all work done in the transaction.
    fn commit(self) -> Result<()>;
    /// Discard all work done in the transaction.
    fn rollback(self) -> Result<()>;
}

/// A connection able to begin a transaction.
pub trait Transactional {
    /// The transaction handle, borrowing the connection.
    type Tx<'c>: TxHandle
    where
        Self: 'c;

    /// Begin a transaction.
    fn begin(&mut self) -> Result<Self::Tx<'_>>;
}

/// Marker type for one SQL backend.
pub trait Backend: Sized + Send + Sync + 'static {
    /// Which backend this is.
    const KIND: BackendKind;
    /// Connection pool.
    type Pool: Send + Sync;
    /// Connection checked out of [`Backend::Pool`].
    type Conn: Transactional + 'static;

    /// Check a connection out of the pool.
    fn checkout(pool: &Self::Pool) -> Result<Self::Conn>;
}

/// Transaction handle type of backend `B`.
pub type Tx<'c, B> = <<B as Backend>::Conn as Transactional>::Tx<'c>;

/// Pool and connection options shared by every backend.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 16).
    pub pool_size: u32,
    /// How long a checkout waits for a free connection (default: 5s).
    pub connection_timeout: Duration,
    /// Busy timeout in milliseconds, `SQLite` only (default: 30000).
    pub busy_timeout_ms: u32,
    /// Page cache size in KiB, `SQLite` only (default: 8192 = 8 MB).
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            connection_timeout: Duration::from_secs(5),
            busy_timeout_ms: 30_000,
            cache_size_kib: 8192,
        }
    }
}

impl From<&DatabaseSettings> for ConnectionConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            pool_size: settings.pool_size,
            busy_timeout_ms: settings.busy_timeout_ms,
            cache_size_kib: settings.cache_size_kib,
            ..Self::default()
        }
    }
}

/// Reject settings that name a different backend than the one being opened.
pub(crate) fn ensure_backend(settings: &DatabaseSettings, expected: BackendKind) -> Result<()> {
    if settings.backend == expected {
        Ok(())
    } else {
        Err(StoreError::InvalidOperation(format!(
            "settings select the {} backend, cannot open as {expected}",
            settings.backend
        )))
    }
}

/// Database handle: pool, recorder and clock for one backend.
///
/// Constructed once at startup and shared (typically behind an `Arc`) by
/// every command. Safe for concurrent use; each command checks out its own
/// connection.
pub struct Database<B: Backend> {
    pool: B::Pool,
    recorder: Arc<dyn ChangeEventRecorder<B>>,
    clock: Arc<HybridLogicalClock>,
}

impl<B: Backend> Database<B> {
    /// Assemble a database handle from its parts.
    pub fn from_parts(
        pool: B::Pool,
        recorder: Arc<dyn ChangeEventRecorder<B>>,
        clock: Arc<HybridLogicalClock>,
    ) -> Self {
        Self {
            pool,
            recorder,
            clock,
        }
    }

    /// Replace the change-event recorder.
    #[must_use]
    pub fn with_recorder(mut self, recorder: impl ChangeEventRecorder<B> + 'static) -> Self {
        self.recorder = Arc::new(recorder);
        self
    }

    /// Replace the clock, e.g. to share one clock between handles.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<HybridLogicalClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Check a connection out of the pool.
    pub fn conn(&self) -> Result<B::Conn> {
        B::checkout(&self.pool)
    }

    /// The connection pool.
    pub fn pool(&self) -> &B::Pool {
        &self.pool
    }

    /// The change-event recorder.
    pub fn recorder(&self) -> &dyn ChangeEventRecorder<B> {
        self.recorder.as_ref()
    }

    /// This node's clock.
    pub fn clock(&self) -> &HybridLogicalClock {
        &self.clock
    }

    /// Which backend this handle talks to.
    pub fn kind(&self) -> BackendKind {
        B::KIND
    }
}

impl<B: Backend> fmt::Debug for Database<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &B::KIND)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
