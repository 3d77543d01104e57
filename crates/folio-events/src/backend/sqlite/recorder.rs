//! `SQLite` change-event recorder.

use rusqlite::Transaction;

use super::Sqlite;
use super::repositories::change_event::ChangeEventRepo;
use crate::change_event::ChangeEventParams;
use crate::errors::Result;
use crate::recorder::ChangeEventRecorder;

/// Writes change events through an open `rusqlite` transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteRecorder;

impl ChangeEventRecorder<Sqlite> for SqliteRecorder {
    fn record(&self, tx: &mut Transaction<'_>, params: &ChangeEventParams) -> Result<()> {
        ChangeEventRepo::insert(tx, params)
    }
}
