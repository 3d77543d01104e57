//! The change-event log interface.
//!
//! [`ChangeEventLog`] is what the replication and webhook subsystems read.
//! Every backend's [`Database`](crate::backend::Database) implements it.

use folio_core::{EventId, Hlc, RecordId};

use crate::change_event::{ChangeEvent, ChangeEventParams};
use crate::errors::Result;

/// The two independent completion flags of a change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleFlag {
    /// Replicated to peer nodes (`synced_at`).
    Synced,
    /// Delivered to downstream subscribers (`consumed_at`).
    Consumed,
}

impl LifecycleFlag {
    /// Column holding the flag's timestamp.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Synced => "synced_at",
            Self::Consumed => "consumed_at",
        }
    }
}

/// Append-only audit log with two independent completion flags.
pub trait ChangeEventLog: Send + Sync {
    /// Insert a new event. Identity and timestamps come from `params`.
    fn record_change_event(&self, params: &ChangeEventParams) -> Result<ChangeEvent>;

    /// Fetch one event. `NotFound` if absent.
    fn get_change_event(&self, id: &EventId) -> Result<ChangeEvent>;

    /// Full history of one record, HLC ascending.
    fn get_change_events_by_record(
        &self,
        table_name: &str,
        record_id: &RecordId,
    ) -> Result<Vec<ChangeEvent>>;

    /// Page through the log, newest (highest HLC) first.
    fn list_change_events(&self, limit: u32, offset: u32) -> Result<Vec<ChangeEvent>>;

    /// Total number of events.
    fn count_change_events(&self) -> Result<u64>;

    /// Events not yet replicated, HLC ascending, at most `limit`.
    fn get_unsynced_events(&self, limit: u32) -> Result<Vec<ChangeEvent>>;

    /// Events not yet delivered, HLC ascending, at most `limit`.
    fn get_unconsumed_events(&self, limit: u32) -> Result<Vec<ChangeEvent>>;

    /// Events with HLC strictly greater than `after`, HLC ascending.
    fn get_events_since(&self, after: Hlc, limit: u32) -> Result<Vec<ChangeEvent>>;

    /// Set `synced_at`. Re-marking keeps the first timestamp and succeeds.
    fn mark_event_synced(&self, id: &EventId) -> Result<()>;

    /// Set `consumed_at`. Re-marking keeps the first timestamp and succeeds.
    fn mark_event_consumed(&self, id: &EventId) -> Result<()>;

    /// Administrative hard delete. `NotFound` if absent.
    fn delete_change_event(&self, id: &EventId) -> Result<()>;
}
