//! `PostgreSQL` change-event recorder.

use ::postgres::Transaction;

use super::Postgres;
use super::repositories::ChangeEventRepo;
use crate::change_event::ChangeEventParams;
use crate::errors::Result;
use crate::recorder::ChangeEventRecorder;

/// Writes change events through an open `postgres` transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresRecorder;

impl ChangeEventRecorder<Postgres> for PostgresRecorder {
    fn record(&self, tx: &mut Transaction<'_>, params: &ChangeEventParams) -> Result<()> {
        ChangeEventRepo::insert(tx, params)
    }
}
