//! Content repository for the `content_data` table.

use ::postgres::{GenericClient, Row};
use folio_core::RecordId;

use crate::entities::content::{
    PostgresContentRow, PostgresCreateContentParams, PostgresUpdateContentParams,
};
use crate::errors::Result;

const COLUMNS: &str = "content_data_id, parent_id, author_id, title, slug, status, sort_order,
     date_created, date_modified";

/// Content repository over any `GenericClient`.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a content node and return the stored row.
    pub fn insert<C: GenericClient>(
        client: &mut C,
        p: &PostgresCreateContentParams,
    ) -> Result<PostgresContentRow> {
        let row = client.query_one(
            &format!(
                "INSERT INTO content_data ({COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING {COLUMNS}"
            ),
            &[
                &p.content_data_id,
                &p.parent_id,
                &p.author_id,
                &p.title,
                &p.slug,
                &p.status,
                &p.sort_order,
                &p.date_created,
                &p.date_modified,
            ],
        )?;
        Self::map_row(&row)
    }

    /// Get a content node by ID.
    pub fn get_by_id<C: GenericClient>(
        client: &mut C,
        id: &RecordId,
    ) -> Result<Option<PostgresContentRow>> {
        client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM content_data WHERE content_data_id = $1"),
                &[&id.as_str()],
            )?
            .as_ref()
            .map(Self::map_row)
            .transpose()
    }

    /// Children of `parent_id` in sort order.
    pub fn list_children<C: GenericClient>(
        client: &mut C,
        parent_id: &RecordId,
    ) -> Result<Vec<PostgresContentRow>> {
        let rows = client.query(
            &format!(
                "SELECT {COLUMNS} FROM content_data WHERE parent_id = $1
                 ORDER BY sort_order ASC, content_data_id ASC"
            ),
            &[&parent_id.as_str()],
        )?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Update a content node's mutable fields. Returns rows changed.
    pub fn update<C: GenericClient>(
        client: &mut C,
        id: &RecordId,
        p: &PostgresUpdateContentParams,
    ) -> Result<u64> {
        Ok(client.execute(
            "UPDATE content_data
             SET parent_id = $1, title = $2, slug = $3, status = $4, sort_order = $5,
                 date_modified = $6
             WHERE content_data_id = $7",
            &[
                &p.parent_id,
                &p.title,
                &p.slug,
                &p.status,
                &p.sort_order,
                &p.date_modified,
                &id.as_str(),
            ],
        )?)
    }

    /// Delete a content node. Returns rows removed.
    pub fn delete<C: GenericClient>(client: &mut C, id: &RecordId) -> Result<u64> {
        Ok(client.execute(
            "DELETE FROM content_data WHERE content_data_id = $1",
            &[&id.as_str()],
        )?)
    }

    fn map_row(row: &Row) -> Result<PostgresContentRow> {
        Ok(PostgresContentRow {
            content_data_id: row.try_get(0)?,
            parent_id: row.try_get(1)?,
            author_id: row.try_get(2)?,
            title: row.try_get(3)?,
            slug: row.try_get(4)?,
            status: row.try_get(5)?,
            sort_order: row.try_get(6)?,
            date_created: row.try_get(7)?,
            date_modified: row.try_get(8)?,
        })
    }
}
