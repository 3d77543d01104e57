//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`.
//! A `rusqlite::Transaction` derefs to `Connection`, so the same methods run
//! inside the orchestrator's transaction or on a bare pooled connection.

pub mod change_event;
pub mod content;
pub mod users;

pub use change_event::ChangeEventRepo;
pub use content::ContentRepo;
pub use users::UserRepo;
