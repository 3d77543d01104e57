//! Repository implementations for `MySQL` database operations.
//!
//! Methods are generic over [`mysql::prelude::Queryable`]: a pooled
//! connection or a `Transaction` both work. Rows are decoded column by
//! column with [`take`], which turns driver conversion failures into
//! [`StoreError::Decode`].

pub mod change_event;
pub mod content;
pub mod users;

use ::mysql::Row;
use ::mysql::prelude::FromValue;

pub use change_event::ChangeEventRepo;
pub use content::ContentRepo;
pub use users::UserRepo;

use crate::errors::{Result, StoreError};

/// Take column `col` out of `row` as `T`.
pub(crate) fn take<T: FromValue>(row: &mut Row, col: &str) -> Result<T> {
    match row.take_opt::<T, _>(col) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(StoreError::Decode(format!("{col}: {e:?}"))),
        None => Err(StoreError::Decode(format!("{col}: column missing"))),
    }
}
