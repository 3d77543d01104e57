//! User repository for the `users` table.

use ::mysql::Row;
use ::mysql::prelude::Queryable;
use folio_core::RecordId;

use super::take;
use crate::entities::users::{MySqlCreateUserParams, MySqlUpdateUserParams, MySqlUserRow};
use crate::errors::Result;

/// User repository over any `Queryable`.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and return the stored row.
    pub fn insert<Q: Queryable>(conn: &mut Q, p: &MySqlCreateUserParams) -> Result<MySqlUserRow> {
        conn.exec_drop(
            "INSERT INTO users (user_id, username, email, role, date_created, date_modified)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                p.user_id.as_str(),
                p.username.as_str(),
                p.email.as_str(),
                p.role,
                p.date_created_ms,
                p.date_modified_ms,
            ),
        )?;
        Ok(MySqlUserRow {
            user_id: p.user_id.clone(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: p.role,
            date_created_ms: p.date_created_ms,
            date_modified_ms: p.date_modified_ms,
        })
    }

    /// Get a user by ID.
    pub fn get_by_id<Q: Queryable>(conn: &mut Q, id: &RecordId) -> Result<Option<MySqlUserRow>> {
        conn.exec_first::<Row, _, _>(
            "SELECT user_id, username, email, role, date_created, date_modified
             FROM users WHERE user_id = ?",
            (id.as_str(),),
        )?
        .map(Self::map_row)
        .transpose()
    }

    /// Update a user's mutable fields. Returns rows matched.
    pub fn update<Q: Queryable>(
        conn: &mut Q,
        id: &RecordId,
        p: &MySqlUpdateUserParams,
    ) -> Result<u64> {
        Ok(conn
            .exec_iter(
                "UPDATE users SET username = ?, email = ?, role = ?, date_modified = ?
                 WHERE user_id = ?",
                (
                    p.username.as_str(),
                    p.email.as_str(),
                    p.role,
                    p.date_modified_ms,
                    id.as_str(),
                ),
            )?
            .affected_rows())
    }

    /// Delete a user. Returns rows removed.
    pub fn delete<Q: Queryable>(conn: &mut Q, id: &RecordId) -> Result<u64> {
        Ok(conn
            .exec_iter("DELETE FROM users WHERE user_id = ?", (id.as_str(),))?
            .affected_rows())
    }

    fn map_row(mut row: Row) -> Result<MySqlUserRow> {
        Ok(MySqlUserRow {
            user_id: take(&mut row, "user_id")?,
            username: take(&mut row, "username")?,
            email: take(&mut row, "email")?,
            role: take(&mut row, "role")?,
            date_created_ms: take(&mut row, "date_created")?,
            date_modified_ms: take(&mut row, "date_modified")?,
        })
    }
}
