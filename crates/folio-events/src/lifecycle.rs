//! Sync and consumption drain loops.
//!
//! Replication and webhook delivery each poll their own flag. A drain pass
//! fetches one batch of unmarked events in HLC order, hands each to the
//! caller's handler and marks it once the handler succeeds. The first
//! handler failure stops the pass: that event and every later one stay
//! unmarked and are returned again by the next poll.
//!
//! Marking is idempotent, so a handler that succeeded on an event whose mark
//! then failed may see the event again. Handlers must tolerate redelivery.

use std::fmt;

use folio_core::EventId;
use folio_settings::LifecycleSettings;
use tracing::{debug, warn};

use crate::change_event::ChangeEvent;
use crate::errors::Result;
use crate::store::{ChangeEventLog, LifecycleFlag};

/// A handler error together with the event it failed on.
#[derive(Debug)]
pub struct HandlerFailure<E> {
    /// Event the handler rejected. It is left unmarked.
    pub event_id: EventId,
    /// What the handler returned.
    pub error: E,
}

/// Outcome of one drain pass.
#[derive(Debug)]
pub struct DrainReport<E> {
    /// Events handled and marked during this pass.
    pub processed: usize,
    /// Set when the pass stopped early on a handler error.
    pub halted: Option<HandlerFailure<E>>,
}

impl<E> DrainReport<E> {
    /// Whether every fetched event was handled.
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Deliver up to `limit` unsynced events to `handler`, marking each as synced.
pub fn drain_unsynced<L, E, F>(log: &L, limit: u32, handler: F) -> Result<DrainReport<E>>
where
    L: ChangeEventLog + ?Sized,
    E: fmt::Display,
    F: FnMut(&ChangeEvent) -> std::result::Result<(), E>,
{
    drain(log, LifecycleFlag::Synced, limit, handler)
}

/// Deliver up to `limit` unconsumed events to `handler`, marking each as consumed.
pub fn drain_unconsumed<L, E, F>(log: &L, limit: u32, handler: F) -> Result<DrainReport<E>>
where
    L: ChangeEventLog + ?Sized,
    E: fmt::Display,
    F: FnMut(&ChangeEvent) -> std::result::Result<(), E>,
{
    drain(log, LifecycleFlag::Consumed, limit, handler)
}

/// One drain pass of at most `settings.batch_size` events.
pub fn drain_batch<L, E, F>(
    log: &L,
    flag: LifecycleFlag,
    settings: &LifecycleSettings,
    handler: F,
) -> Result<DrainReport<E>>
where
    L: ChangeEventLog + ?Sized,
    E: fmt::Display,
    F: FnMut(&ChangeEvent) -> std::result::Result<(), E>,
{
    drain(log, flag, settings.batch_size, handler)
}

/// One drain pass over the events whose `flag` is unset.
///
/// Storage errors (fetching the batch or marking an event) are returned as
/// `Err`; handler errors end the pass and are reported in
/// [`DrainReport::halted`].
pub fn drain<L, E, F>(
    log: &L,
    flag: LifecycleFlag,
    limit: u32,
    mut handler: F,
) -> Result<DrainReport<E>>
where
    L: ChangeEventLog + ?Sized,
    E: fmt::Display,
    F: FnMut(&ChangeEvent) -> std::result::Result<(), E>,
{
    let batch = match flag {
        LifecycleFlag::Synced => log.get_unsynced_events(limit)?,
        LifecycleFlag::Consumed => log.get_unconsumed_events(limit)?,
    };
    let mut processed = 0;

    for event in &batch {
        if let Err(error) = handler(event) {
            warn!(
                event_id = %event.event_id,
                ?flag,
                processed,
                error = %error,
                "handler failed, stopping drain"
            );
            return Ok(DrainReport {
                processed,
                halted: Some(HandlerFailure {
                    event_id: event.event_id.clone(),
                    error,
                }),
            });
        }
        match flag {
            LifecycleFlag::Synced => log.mark_event_synced(&event.event_id)?,
            LifecycleFlag::Consumed => log.mark_event_consumed(&event.event_id)?,
        }
        processed += 1;
    }

    debug!(?flag, processed, fetched = batch.len(), "drain pass complete");
    Ok(DrainReport {
        processed,
        halted: None,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::backend::sqlite::Sqlite;
    use crate::backend::{ConnectionConfig, Database};
    use crate::change_event::{Action, ChangeEventParams, Operation};
    use folio_core::{NodeId, RecordId};

    fn setup(n: usize) -> (Database<Sqlite>, Vec<EventId>) {
        let db = Database::<Sqlite>::open_in_memory(&ConnectionConfig::default()).unwrap();
        let record = RecordId::new();
        let ids = (0..n)
            .map(|_| {
                let params = ChangeEventParams {
                    event_id: EventId::new(),
                    hlc_timestamp: db.clock().now(),
                    wall_timestamp: folio_core::time::now_ms(),
                    node_id: NodeId::from("node-a"),
                    table_name: "users".into(),
                    record_id: record.clone(),
                    operation: Operation::Update,
                    action: Action::Update,
                    user_id: None,
                    request_id: None,
                    ip: None,
                    old_values: None,
                    new_values: None,
                    metadata: None,
                };
                db.record_change_event(&params).unwrap();
                params.event_id
            })
            .collect();
        (db, ids)
    }

    #[test]
    fn drains_in_hlc_order_and_marks() {
        let (db, ids) = setup(3);
        let mut seen = Vec::new();
        let report = drain_unsynced(&db, 10, |event| {
            seen.push(event.event_id.clone());
            Ok::<_, String>(())
        })
        .unwrap();

        assert_eq!(report.processed, 3);
        assert!(report.is_complete());
        assert_eq!(seen, ids);
        assert!(db.get_unsynced_events(10).unwrap().is_empty());
        assert_eq!(db.get_unconsumed_events(10).unwrap().len(), 3);
    }

    #[test]
    fn stops_at_first_handler_error() {
        let (db, ids) = setup(4);
        let report = drain_unconsumed(&db, 10, |event| {
            if event.event_id == ids[2] {
                Err("webhook returned 503")
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(report.processed, 2);
        let failure = report.halted.unwrap();
        assert_eq!(failure.event_id, ids[2]);
        assert_eq!(failure.error, "webhook returned 503");

        let remaining: Vec<_> = db
            .get_unconsumed_events(10)
            .unwrap()
            .into_iter()
            .map(|e| e.event_id)
            .collect();
        assert_eq!(remaining, ids[2..].to_vec());
    }

    #[test]
    fn respects_limit() {
        let (db, _) = setup(5);
        let report = drain_unsynced(&db, 2, |_| Ok::<_, String>(())).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(db.get_unsynced_events(10).unwrap().len(), 3);
    }

    #[test]
    fn batch_size_comes_from_settings() {
        let (db, ids) = setup(5);
        let settings = LifecycleSettings { batch_size: 2 };
        let mut seen = Vec::new();
        let report = drain_batch(&db, LifecycleFlag::Consumed, &settings, |event| {
            seen.push(event.event_id.clone());
            Ok::<_, String>(())
        })
        .unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(seen, ids[..2].to_vec());
        assert_eq!(db.get_unconsumed_events(10).unwrap().len(), 3);
    }

    #[test]
    fn flags_progress_independently() {
        let (db, _) = setup(2);
        drain_unsynced(&db, 10, |_| Ok::<_, String>(())).unwrap();
        let report = drain_unconsumed(&db, 10, |_| Ok::<_, String>(())).unwrap();
        assert_eq!(report.processed, 2);
        let again = drain_unsynced(&db, 10, |_| Ok::<_, String>(())).unwrap();
        assert_eq!(again.processed, 0);
    }
}
