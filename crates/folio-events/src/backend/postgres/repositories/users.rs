//! User repository for the `users` table.

use ::postgres::{GenericClient, Row};
use folio_core::RecordId;

use crate::entities::users::{PostgresCreateUserParams, PostgresUpdateUserParams, PostgresUserRow};
use crate::errors::Result;

/// User repository over any `GenericClient`.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and return the stored row.
    pub fn insert<C: GenericClient>(
        client: &mut C,
        p: &PostgresCreateUserParams,
    ) -> Result<PostgresUserRow> {
        let row = client.query_one(
            "INSERT INTO users (user_id, username, email, role, date_created, date_modified)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING user_id, username, email, role, date_created, date_modified",
            &[&p.user_id, &p.username, &p.email, &p.role, &p.date_created, &p.date_modified],
        )?;
        Self::map_row(&row)
    }

    /// Get a user by ID.
    pub fn get_by_id<C: GenericClient>(client: &mut C, id: &RecordId) -> Result<Option<PostgresUserRow>> {
        client
            .query_opt(
                "SELECT user_id, username, email, role, date_created, date_modified
                 FROM users WHERE user_id = $1",
                &[&id.as_str()],
            )?
            .as_ref()
            .map(Self::map_row)
            .transpose()
    }

    /// Update a user's mutable fields. Returns rows changed.
    pub fn update<C: GenericClient>(
        client: &mut C,
        id: &RecordId,
        p: &PostgresUpdateUserParams,
    ) -> Result<u64> {
        Ok(client.execute(
            "UPDATE users SET username = $1, email = $2, role = $3, date_modified = $4
             WHERE user_id = $5",
            &[&p.username, &p.email, &p.role, &p.date_modified, &id.as_str()],
        )?)
    }

    /// Delete a user. Returns rows removed.
    pub fn delete<C: GenericClient>(client: &mut C, id: &RecordId) -> Result<u64> {
        Ok(client.execute("DELETE FROM users WHERE user_id = $1", &[&id.as_str()])?)
    }

    fn map_row(row: &Row) -> Result<PostgresUserRow> {
        Ok(PostgresUserRow {
            user_id: row.try_get(0)?,
            username: row.try_get(1)?,
            email: row.try_get(2)?,
            role: row.try_get(3)?,
            date_created: row.try_get(4)?,
            date_modified: row.try_get(5)?,
        })
    }
}
