//! The change-event recorder capability.
//!
//! One implementation per backend. A recorder writes a single audit row
//! through the caller's open transaction, so the row commits or rolls back
//! together with the mutation it describes.

use crate::backend::{Backend, Tx};
use crate::change_event::ChangeEventParams;
use crate::errors::Result;

/// Persists a change event inside a caller-supplied transaction.
///
/// Implementations translate [`ChangeEventParams`] into the backend's native
/// insert, bridging column names and value widths. They must not commit,
/// roll back or open transactions of their own.
pub trait ChangeEventRecorder<B: Backend>: Send + Sync {
    /// Write `params` as a new change-event row.
    fn record(&self, tx: &mut Tx<'_, B>, params: &ChangeEventParams) -> Result<()>;
}
