//! Content repository for the `content_data` table.

use folio_core::RecordId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::entities::content::{
    SqliteContentRow, SqliteCreateContentParams, SqliteUpdateContentParams,
};
use crate::errors::Result;

/// Content repository — stateless, every method takes `&Connection`.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a content node and return the stored row.
    pub fn insert(conn: &Connection, p: &SqliteCreateContentParams) -> Result<SqliteContentRow> {
        let _ = conn.execute(
            "INSERT INTO content_data (content_data_id, parent_id, author_id, title, slug,
                 status, sort_order, date_created, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                p.content_data_id,
                p.parent_id,
                p.author_id,
                p.title,
                p.slug,
                p.status,
                p.sort_order,
                p.date_created,
                p.date_modified
            ],
        )?;
        Ok(SqliteContentRow {
            content_data_id: p.content_data_id.clone(),
            parent_id: p.parent_id.clone(),
            author_id: p.author_id.clone(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: p.status,
            sort_order: p.sort_order,
            date_created: p.date_created,
            date_modified: p.date_modified,
        })
    }

    /// Get a content node by ID.
    pub fn get_by_id(conn: &Connection, id: &RecordId) -> Result<Option<SqliteContentRow>> {
        let row = conn
            .query_row(
                "SELECT content_data_id, parent_id, author_id, title, slug, status,
                        sort_order, date_created, date_modified
                 FROM content_data WHERE content_data_id = ?1",
                params![id.as_str()],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Children of `parent_id` in sort order.
    pub fn list_children(conn: &Connection, parent_id: &RecordId) -> Result<Vec<SqliteContentRow>> {
        let mut stmt = conn.prepare(
            "SELECT content_data_id, parent_id, author_id, title, slug, status,
                    sort_order, date_created, date_modified
             FROM content_data WHERE parent_id = ?1
             ORDER BY sort_order ASC, content_data_id ASC",
        )?;
        let rows = stmt
            .query_map(params![parent_id.as_str()], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update a content node's mutable fields. Returns rows changed.
    pub fn update(
        conn: &Connection,
        id: &RecordId,
        p: &SqliteUpdateContentParams,
    ) -> Result<u64> {
        let changed = conn.execute(
            "UPDATE content_data
             SET parent_id = ?1, title = ?2, slug = ?3, status = ?4, sort_order = ?5,
                 date_modified = ?6
             WHERE content_data_id = ?7",
            params![
                p.parent_id,
                p.title,
                p.slug,
                p.status,
                p.sort_order,
                p.date_modified,
                id.as_str()
            ],
        )?;
        Ok(changed as u64)
    }

    /// Delete a content node. Returns rows removed.
    pub fn delete(conn: &Connection, id: &RecordId) -> Result<u64> {
        let changed = conn.execute(
            "DELETE FROM content_data WHERE content_data_id = ?1",
            params![id.as_str()],
        )?;
        Ok(changed as u64)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SqliteContentRow> {
        Ok(SqliteContentRow {
            content_data_id: row.get(0)?,
            parent_id: row.get(1)?,
            author_id: row.get(2)?,
            title: row.get(3)?,
            slug: row.get(4)?,
            status: row.get(5)?,
            sort_order: row.get(6)?,
            date_created: row.get(7)?,
            date_modified: row.get(8)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
