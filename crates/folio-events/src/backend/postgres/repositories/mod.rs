//! Repository implementations for `PostgreSQL` database operations.
//!
//! Methods are generic over [`postgres::GenericClient`], so they run on a
//! bare pooled `Client` or inside a `Transaction` alike.

pub mod change_event;
pub mod content;
pub mod users;

pub use change_event::ChangeEventRepo;
pub use content::ContentRepo;
pub use users::UserRepo;
