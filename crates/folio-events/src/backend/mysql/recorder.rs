//! `MySQL` change-event recorder.

use ::mysql::Transaction;

use super::MySql;
use super::repositories::ChangeEventRepo;
use crate::change_event::ChangeEventParams;
use crate::errors::Result;
use crate::recorder::ChangeEventRecorder;

/// Writes change events through an open `mysql` transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySqlRecorder;

impl ChangeEventRecorder<MySql> for MySqlRecorder {
    fn record(&self, tx: &mut Transaction<'_>, params: &ChangeEventParams) -> Result<()> {
        ChangeEventRepo::insert(tx, params)
    }
}
