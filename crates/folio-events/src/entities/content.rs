//! `content_data` entity: canonical type and per-backend row/param types.
//!
//! Widths differ the most here: `status` is `SMALLINT` on `PostgreSQL` and
//! `INT` on `MySQL`, `sort_order` is `INT` on both, and `SQLite` stores
//! every integer as 64-bit.

use chrono::{DateTime, Utc};
use folio_core::RecordId;
use serde::{Deserialize, Serialize};

use super::{Entity, FromCanonical, IntoCanonical, from_epoch_ms, narrow, record_id};
use crate::errors::Result;

/// Draft, not publicly visible.
pub const STATUS_DRAFT: i64 = 0;
/// Publicly visible.
pub const STATUS_PUBLISHED: i64 = 1;
/// Withdrawn from public view.
pub const STATUS_ARCHIVED: i64 = 2;

/// Canonical content node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentData {
    /// Primary key.
    pub content_data_id: RecordId,
    /// Parent node in the content tree.
    pub parent_id: Option<RecordId>,
    /// Authoring user.
    pub author_id: RecordId,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Publication status code.
    pub status: i64,
    /// Position among siblings.
    pub sort_order: i64,
    /// Creation time.
    pub date_created: DateTime<Utc>,
    /// Last modification time.
    pub date_modified: DateTime<Utc>,
}

impl ContentData {
    /// Whether the node is publicly visible.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }
}

/// Canonical create parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentParams {
    /// Parent node.
    pub parent_id: Option<RecordId>,
    /// Authoring user.
    pub author_id: RecordId,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Publication status code.
    pub status: i64,
    /// Position among siblings.
    pub sort_order: i64,
}

/// Canonical update parameters (full replacement of mutable fields).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentParams {
    /// Parent node.
    pub parent_id: Option<RecordId>,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Publication status code.
    pub status: i64,
    /// Position among siblings.
    pub sort_order: i64,
}

impl UpdateContentParams {
    /// Update params that keep everything from `current` but the status.
    #[must_use]
    pub fn with_status(current: &ContentData, status: i64) -> Self {
        Self {
            parent_id: current.parent_id.clone(),
            title: current.title.clone(),
            slug: current.slug.clone(),
            status,
            sort_order: current.sort_order,
        }
    }
}

impl Entity for ContentData {
    const TABLE: &'static str = "content_data";
    type CreateParams = CreateContentParams;
    type UpdateParams = UpdateContentParams;

    fn id(&self) -> &RecordId {
        &self.content_data_id
    }
}

fn optional_record_id(raw: Option<String>, field: &str) -> Result<Option<RecordId>> {
    raw.map(|id| record_id(id, field)).transpose()
}

fn id_text(id: Option<&RecordId>) -> Option<String> {
    id.map(|id| id.as_str().to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

/// `content_data` row as read by the `SQLite` driver.
#[derive(Clone, Debug)]
pub struct SqliteContentRow {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i64,
    /// Sibling position.
    pub sort_order: i64,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `SQLite` insert parameters.
#[derive(Clone, Debug)]
pub struct SqliteCreateContentParams {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i64,
    /// Sibling position.
    pub sort_order: i64,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `SQLite` update parameters.
#[derive(Clone, Debug)]
pub struct SqliteUpdateContentParams {
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i64,
    /// Sibling position.
    pub sort_order: i64,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

impl IntoCanonical for SqliteContentRow {
    type Canonical = ContentData;

    fn into_canonical(self) -> Result<ContentData> {
        Ok(ContentData {
            content_data_id: record_id(self.content_data_id, "content_data.content_data_id")?,
            parent_id: optional_record_id(self.parent_id, "content_data.parent_id")?,
            author_id: record_id(self.author_id, "content_data.author_id")?,
            title: self.title,
            slug: self.slug,
            status: self.status,
            sort_order: self.sort_order,
            date_created: self.date_created,
            date_modified: self.date_modified,
        })
    }
}

impl FromCanonical<CreateContentParams> for SqliteCreateContentParams {
    fn from_canonical(p: &CreateContentParams) -> Result<Self> {
        let now = folio_core::time::now_ms();
        Ok(Self {
            content_data_id: RecordId::new().into_inner(),
            parent_id: id_text(p.parent_id.as_ref()),
            author_id: p.author_id.as_str().to_owned(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: p.status,
            sort_order: p.sort_order,
            date_created: now,
            date_modified: now,
        })
    }
}

impl FromCanonical<UpdateContentParams> for SqliteUpdateContentParams {
    fn from_canonical(p: &UpdateContentParams) -> Result<Self> {
        Ok(Self {
            parent_id: id_text(p.parent_id.as_ref()),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: p.status,
            sort_order: p.sort_order,
            date_modified: folio_core::time::now_ms(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL: SMALLINT status, INT sort order
// ─────────────────────────────────────────────────────────────────────────────

/// `content_data` row as read by the `PostgreSQL` driver.
#[derive(Clone, Debug)]
pub struct PostgresContentRow {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i16,
    /// Sibling position.
    pub sort_order: i32,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `PostgreSQL` insert parameters.
#[derive(Clone, Debug)]
pub struct PostgresCreateContentParams {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i16,
    /// Sibling position.
    pub sort_order: i32,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `PostgreSQL` update parameters.
#[derive(Clone, Debug)]
pub struct PostgresUpdateContentParams {
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i16,
    /// Sibling position.
    pub sort_order: i32,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

impl IntoCanonical for PostgresContentRow {
    type Canonical = ContentData;

    fn into_canonical(self) -> Result<ContentData> {
        Ok(ContentData {
            content_data_id: record_id(self.content_data_id, "content_data.content_data_id")?,
            parent_id: optional_record_id(self.parent_id, "content_data.parent_id")?,
            author_id: record_id(self.author_id, "content_data.author_id")?,
            title: self.title,
            slug: self.slug,
            status: i64::from(self.status),
            sort_order: i64::from(self.sort_order),
            date_created: self.date_created,
            date_modified: self.date_modified,
        })
    }
}

impl FromCanonical<CreateContentParams> for PostgresCreateContentParams {
    fn from_canonical(p: &CreateContentParams) -> Result<Self> {
        let now = folio_core::time::now_ms();
        Ok(Self {
            content_data_id: RecordId::new().into_inner(),
            parent_id: id_text(p.parent_id.as_ref()),
            author_id: p.author_id.as_str().to_owned(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: narrow(p.status, "content_data.status")?,
            sort_order: narrow(p.sort_order, "content_data.sort_order")?,
            date_created: now,
            date_modified: now,
        })
    }
}

impl FromCanonical<UpdateContentParams> for PostgresUpdateContentParams {
    fn from_canonical(p: &UpdateContentParams) -> Result<Self> {
        Ok(Self {
            parent_id: id_text(p.parent_id.as_ref()),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: narrow(p.status, "content_data.status")?,
            sort_order: narrow(p.sort_order, "content_data.sort_order")?,
            date_modified: folio_core::time::now_ms(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MySQL: INT status and sort order, epoch-ms timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// `content_data` row as read by the `MySQL` driver.
#[derive(Clone, Debug)]
pub struct MySqlContentRow {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i32,
    /// Sibling position.
    pub sort_order: i32,
    /// Creation time, epoch milliseconds.
    pub date_created_ms: i64,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

/// `MySQL` insert parameters.
#[derive(Clone, Debug)]
pub struct MySqlCreateContentParams {
    /// Content ID (ULID text).
    pub content_data_id: String,
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Author user ID.
    pub author_id: String,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i32,
    /// Sibling position.
    pub sort_order: i32,
    /// Creation time, epoch milliseconds.
    pub date_created_ms: i64,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

/// `MySQL` update parameters.
#[derive(Clone, Debug)]
pub struct MySqlUpdateContentParams {
    /// Parent content ID.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Status code.
    pub status: i32,
    /// Sibling position.
    pub sort_order: i32,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

impl IntoCanonical for MySqlContentRow {
    type Canonical = ContentData;

    fn into_canonical(self) -> Result<ContentData> {
        Ok(ContentData {
            content_data_id: record_id(self.content_data_id, "content_data.content_data_id")?,
            parent_id: optional_record_id(self.parent_id, "content_data.parent_id")?,
            author_id: record_id(self.author_id, "content_data.author_id")?,
            title: self.title,
            slug: self.slug,
            status: i64::from(self.status),
            sort_order: i64::from(self.sort_order),
            date_created: from_epoch_ms(self.date_created_ms, "content_data.date_created")?,
            date_modified: from_epoch_ms(self.date_modified_ms, "content_data.date_modified")?,
        })
    }
}

impl FromCanonical<CreateContentParams> for MySqlCreateContentParams {
    fn from_canonical(p: &CreateContentParams) -> Result<Self> {
        let now = folio_core::time::to_epoch_ms(folio_core::time::now_ms());
        Ok(Self {
            content_data_id: RecordId::new().into_inner(),
            parent_id: id_text(p.parent_id.as_ref()),
            author_id: p.author_id.as_str().to_owned(),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: narrow(p.status, "content_data.status")?,
            sort_order: narrow(p.sort_order, "content_data.sort_order")?,
            date_created_ms: now,
            date_modified_ms: now,
        })
    }
}

impl FromCanonical<UpdateContentParams> for MySqlUpdateContentParams {
    fn from_canonical(p: &UpdateContentParams) -> Result<Self> {
        Ok(Self {
            parent_id: id_text(p.parent_id.as_ref()),
            title: p.title.clone(),
            slug: p.slug.clone(),
            status: narrow(p.status, "content_data.status")?,
            sort_order: narrow(p.sort_order, "content_data.sort_order")?,
            date_modified_ms: folio_core::time::to_epoch_ms(folio_core::time::now_ms()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
