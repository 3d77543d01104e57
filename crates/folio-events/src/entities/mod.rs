//! Driver normalization layer.
//!
//! Each entity has one canonical type plus one row and one param type per
//! backend. Backend types differ in integer width and timestamp encoding;
//! the conversions here make every backend produce the same canonical value
//! for the same logical row.
//!
//! - **[`IntoCanonical`]**: driver row → canonical (`MapRow`)
//! - **[`FromCanonical`]**: canonical params → driver params
//!   (`MapCreateParams`, `MapUpdateParams`)

pub mod content;
pub mod users;

use std::fmt::Display;

use chrono::{DateTime, Utc};
use folio_core::RecordId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{Result, StoreError};

pub use content::{ContentData, CreateContentParams, UpdateContentParams};
pub use users::{CreateUserParams, UpdateUserParams, User};

/// A canonical, audited entity.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name recorded in change events.
    const TABLE: &'static str;
    /// Canonical create parameters.
    type CreateParams: Serialize + Send + Sync;
    /// Canonical update parameters.
    type UpdateParams: Serialize + Send + Sync;

    /// Primary key.
    fn id(&self) -> &RecordId;
}

/// Convert a driver row into its canonical form.
pub trait IntoCanonical {
    /// The canonical type.
    type Canonical;

    /// Perform the conversion.
    fn into_canonical(self) -> Result<Self::Canonical>;
}

/// Build driver parameters from canonical parameters.
pub trait FromCanonical<C>: Sized {
    /// Perform the conversion. Create params receive a fresh ID per call.
    fn from_canonical(canonical: &C) -> Result<Self>;
}

/// Narrow a canonical integer to a backend column type.
pub(crate) fn narrow<T>(value: i64, field: &str) -> Result<T>
where
    T: TryFrom<i64>,
{
    T::try_from(value).map_err(|_| {
        StoreError::ConstraintViolation(format!(
            "{field} value {value} does not fit the column type"
        ))
    })
}

/// Decode an epoch-milliseconds column.
pub(crate) fn from_epoch_ms(ms: i64, field: &str) -> Result<DateTime<Utc>> {
    folio_core::time::from_epoch_ms(ms)
        .ok_or_else(|| StoreError::Decode(format!("{field}: {ms} is not a valid epoch-ms timestamp")))
}

/// Validate an identifier read from a driver row.
pub(crate) fn record_id(raw: String, field: &str) -> Result<RecordId> {
    RecordId::parse(&raw).map_err(|e| decode_err(field, e))
}

fn decode_err(field: &str, e: impl Display) -> StoreError {
    StoreError::Decode(format!("{field}: {e}"))
}
