//! Error types for the change-event engine.
//!
//! [`StoreError`] is returned by every storage-level operation (repositories,
//! recorders, migrations, pool checkout). [`AuditError`] is what the audited
//! orchestrator surfaces: one wrapped, terminal error per failed command,
//! tagged with the step that failed.

use std::fmt;

use thiserror::Error;

/// Errors that can occur during storage operations on any backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `PostgreSQL` database error.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    /// `MySQL` database error.
    #[cfg(feature = "mysql")]
    #[error("mysql error: {0}")]
    MySql(#[from] mysql::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested row was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row (e.g. `"change event"`, `"users"`).
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// A value violates a schema constraint before reaching the database
    /// (e.g. a canonical integer that does not fit a narrower column).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be decoded into its Rust type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid operation on the store.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl StoreError {
    /// Shorthand for a missing change event.
    pub fn event_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "change event",
            id: id.into(),
        }
    }

    /// Whether this error reports a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is an integrity-constraint violation, raised
    /// either client-side or by any backend driver.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.code().is_some_and(|state| state.code().starts_with("23")),
            #[cfg(feature = "mysql")]
            Self::MySql(mysql::Error::MySqlError(e)) => {
                // 3819: CHECK constraint violated (SQLSTATE HY000)
                e.state.starts_with("23") || e.code == 3819
            }
            _ => false,
        }
    }
}

/// Convenience type alias for storage results.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Transaction boundary that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxPhase {
    /// Connection checkout or `BEGIN`.
    Begin,
    /// `COMMIT`.
    Commit,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
        })
    }
}

/// Errors surfaced by the audited Create/Update/Delete orchestrator.
///
/// Every variant is terminal for the call: the enclosing transaction has
/// been rolled back (or the rollback failure is reported in
/// [`AuditError::Rollback`]) and nothing is retried.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Update/Delete target row does not exist. No event was written.
    #[error("{table} record not found: {record_id}")]
    NotFound {
        /// Table of the missing row.
        table: String,
        /// ID that was looked up.
        record_id: String,
    },

    /// The mutation itself (or its before-snapshot read) failed.
    #[error("execute failed on {table}: {source}")]
    Execute {
        /// Table being mutated.
        table: String,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },

    /// Encoding an old/new snapshot to JSON failed.
    #[error("failed to serialize audit payload for {table}: {source}")]
    Serialization {
        /// Table being mutated.
        table: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the audit row failed.
    #[error("failed to record change event for {table}/{record_id}: {source}")]
    Record {
        /// Table being mutated.
        table: String,
        /// Record the event describes.
        record_id: String,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },

    /// Beginning or committing the transaction failed.
    #[error("transaction {phase} failed: {source}")]
    Transaction {
        /// Which boundary failed.
        phase: TxPhase,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },

    /// Rolling back after an earlier failure also failed.
    #[error("rollback failed after error ({original}): {source}")]
    Rollback {
        /// The error that triggered the rollback.
        original: Box<AuditError>,
        /// Why the rollback failed.
        #[source]
        source: StoreError,
    },

    /// The cancellation token fired before the transaction committed.
    #[error("operation cancelled")]
    Cancelled,
}

impl AuditError {
    /// Whether the command failed because its target row was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the underlying cause is an integrity-constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Execute { source, .. } | Self::Record { source, .. } => {
                source.is_constraint_violation()
            }
            Self::Rollback { original, .. } => original.is_constraint_violation(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
