//! Content repository for the `content_data` table.

use ::mysql::prelude::Queryable;
use ::mysql::{Params, Row, Value};
use folio_core::RecordId;

use super::take;
use crate::entities::content::{
    MySqlContentRow, MySqlCreateContentParams, MySqlUpdateContentParams,
};
use crate::errors::Result;

const COLUMNS: &str = "content_data_id, parent_id, author_id, title, slug, status, sort_order,
     date_created, date_modified";

/// Content repository over any `Queryable`.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a content node and return the stored row.
    pub fn insert<Q: Queryable>(
        conn: &mut Q,
        p: &MySqlCreateContentParams,
    ) -> Result<MySqlContentRow> {
        conn.exec_drop(
            format!("INSERT INTO content_data ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            Params::Positional(vec![
                Value::from(p.content_data_id.as_str()),
                Value::from(p.parent_id.as_deref()),
                Value::from(p.author_id.as_str()),
                Value::from(p.title.as_str()),
                Value::from(p.slug.as_str()),
                Value::from(p.status),
                Value::from(p.sort_order),
                Value::from(p.date_created_ms),
                Value::from(p.date_modified_ms),
            ]),
        )?;
        Ok(MySqlContentRow {
            content_data_id: p.content_data_id.clone(),
            parent_id: p.parent_id.clone(),
            author_id: p.author_id.clone(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: p.status,
            sort_order: p.sort_order,
            date_created_ms: p.date_created_ms,
            date_modified_ms: p.date_modified_ms,
        })
    }

    /// Get a content node by ID.
    pub fn get_by_id<Q: Queryable>(conn: &mut Q, id: &RecordId) -> Result<Option<MySqlContentRow>> {
        conn.exec_first::<Row, _, _>(
            format!("SELECT {COLUMNS} FROM content_data WHERE content_data_id = ?"),
            (id.as_str(),),
        )?
        .map(Self::map_row)
        .transpose()
    }

    /// Children of `parent_id` in sort order.
    pub fn list_children<Q: Queryable>(
        conn: &mut Q,
        parent_id: &RecordId,
    ) -> Result<Vec<MySqlContentRow>> {
        conn.exec::<Row, _, _>(
            format!(
                "SELECT {COLUMNS} FROM content_data WHERE parent_id = ?
                 ORDER BY sort_order ASC, content_data_id ASC"
            ),
            (parent_id.as_str(),),
        )?
        .into_iter()
        .map(Self::map_row)
        .collect()
    }

    /// Update a content node's mutable fields. Returns rows matched.
    pub fn update<Q: Queryable>(
        conn: &mut Q,
        id: &RecordId,
        p: &MySqlUpdateContentParams,
    ) -> Result<u64> {
        Ok(conn
            .exec_iter(
                "UPDATE content_data
                 SET parent_id = ?, title = ?, slug = ?, status = ?, sort_order = ?,
                     date_modified = ?
                 WHERE content_data_id = ?",
                Params::Positional(vec![
                    Value::from(p.parent_id.as_deref()),
                    Value::from(p.title.as_str()),
                    Value::from(p.slug.as_str()),
                    Value::from(p.status),
                    Value::from(p.sort_order),
                    Value::from(p.date_modified_ms),
                    Value::from(id.as_str()),
                ]),
            )?
            .affected_rows())
    }

    /// Delete a content node. Returns rows removed.
    pub fn delete<Q: Queryable>(conn: &mut Q, id: &RecordId) -> Result<u64> {
        Ok(conn
            .exec_iter(
                "DELETE FROM content_data WHERE content_data_id = ?",
                (id.as_str(),),
            )?
            .affected_rows())
    }

    fn map_row(mut row: Row) -> Result<MySqlContentRow> {
        Ok(MySqlContentRow {
            content_data_id: take(&mut row, "content_data_id")?,
            parent_id: take(&mut row, "parent_id")?,
            author_id: take(&mut row, "author_id")?,
            title: take(&mut row, "title")?,
            slug: take(&mut row, "slug")?,
            status: take(&mut row, "status")?,
            sort_order: take(&mut row, "sort_order")?,
            date_created_ms: take(&mut row, "date_created")?,
            date_modified_ms: take(&mut row, "date_modified")?,
        })
    }
}
