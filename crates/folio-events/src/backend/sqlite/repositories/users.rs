//! User repository for the `users` table.

use folio_core::RecordId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::entities::users::{SqliteCreateUserParams, SqliteUpdateUserParams, SqliteUserRow};
use crate::errors::Result;

/// User repository — stateless, every method takes `&Connection`.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and return the stored row.
    pub fn insert(conn: &Connection, p: &SqliteCreateUserParams) -> Result<SqliteUserRow> {
        let _ = conn.execute(
            "INSERT INTO users (user_id, username, email, role, date_created, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![p.user_id, p.username, p.email, p.role, p.date_created, p.date_modified],
        )?;
        Ok(SqliteUserRow {
            user_id: p.user_id.clone(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: p.role,
            date_created: p.date_created,
            date_modified: p.date_modified,
        })
    }

    /// Get a user by ID.
    pub fn get_by_id(conn: &Connection, id: &RecordId) -> Result<Option<SqliteUserRow>> {
        let row = conn
            .query_row(
                "SELECT user_id, username, email, role, date_created, date_modified
                 FROM users WHERE user_id = ?1",
                params![id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Update a user's mutable fields. Returns rows changed.
    pub fn update(conn: &Connection, id: &RecordId, p: &SqliteUpdateUserParams) -> Result<u64> {
        let changed = conn.execute(
            "UPDATE users SET username = ?1, email = ?2, role = ?3, date_modified = ?4
             WHERE user_id = ?5",
            params![p.username, p.email, p.role, p.date_modified, id.as_str()],
        )?;
        Ok(changed as u64)
    }

    /// Delete a user. Returns rows removed.
    pub fn delete(conn: &Connection, id: &RecordId) -> Result<u64> {
        let changed = conn.execute("DELETE FROM users WHERE user_id = ?1", params![id.as_str()])?;
        Ok(changed as u64)
    }

    /// Count users.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SqliteUserRow> {
        Ok(SqliteUserRow {
            user_id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            date_created: row.get(4)?,
            date_modified: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
