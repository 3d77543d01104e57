//! Generic audited commands over any [`Entity`].
//!
//! Each backend implements [`EntityOps`] once per entity (the narrow SQL
//! glue); [`CreateEntity`], [`UpdateEntity`] and [`DeleteEntity`] then give
//! every entity/backend pair the full audited command set.

use std::marker::PhantomData;

use folio_core::{AuditContext, RecordId};

use super::command::{AuditedCommand, CreateCommand, DeleteCommand, UpdateCommand};
use crate::backend::{Backend, Database, Tx};
use crate::change_event::{Action, JsonBlob, Operation};
use crate::entities::Entity;
use crate::errors::{Result, StoreError};

/// Per-backend storage operations for entity `E`.
///
/// Implementations map canonical params to driver params, run the SQL, and
/// map driver rows back to `E`.
pub trait EntityOps<E: Entity>: Backend {
    /// Insert a new row (fresh ID assigned) and return it.
    fn insert(tx: &mut Tx<'_, Self>, params: &E::CreateParams) -> Result<E>;

    /// Fetch a row by ID inside the command's transaction.
    fn get(tx: &mut Tx<'_, Self>, id: &RecordId) -> Result<Option<E>>;

    /// Fetch a row by ID on a pooled connection, outside any transaction.
    fn find(conn: &mut Self::Conn, id: &RecordId) -> Result<Option<E>>;

    /// Update a row. Returns the number of rows changed.
    fn update(tx: &mut Tx<'_, Self>, id: &RecordId, params: &E::UpdateParams) -> Result<u64>;

    /// Delete a row. Returns the number of rows removed.
    fn delete(tx: &mut Tx<'_, Self>, id: &RecordId) -> Result<u64>;
}

impl<B: Backend> Database<B> {
    /// Read one entity outside any audited command.
    ///
    /// Runs on a plain pooled connection, so it never waits on a writer's
    /// transaction lock.
    pub fn fetch<E: Entity>(&self, id: &RecordId) -> Result<Option<E>>
    where
        B: EntityOps<E>,
    {
        let mut conn = self.conn()?;
        B::find(&mut conn, id)
    }
}

fn expect_one(changed: u64, table: &'static str, id: &RecordId) -> Result<()> {
    if changed == 0 {
        Err(StoreError::NotFound {
            entity: table,
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

/// Audited insert of an `E`.
pub struct CreateEntity<'a, B: Backend, E: Entity> {
    db: &'a Database<B>,
    ctx: &'a AuditContext,
    params: E::CreateParams,
    action: Action,
    metadata: Option<JsonBlob>,
}

impl<'a, B: EntityOps<E>, E: Entity> CreateEntity<'a, B, E> {
    /// Build the command.
    pub fn new(db: &'a Database<B>, ctx: &'a AuditContext, params: E::CreateParams) -> Self {
        Self {
            db,
            ctx,
            params,
            action: Operation::Insert.default_action(),
            metadata: None,
        }
    }

    /// Record a different semantic action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach caller metadata to the event.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonBlob) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl<B: EntityOps<E>, E: Entity> AuditedCommand for CreateEntity<'_, B, E> {
    type Backend = B;

    fn table_name(&self) -> &str {
        E::TABLE
    }

    fn audit_context(&self) -> &AuditContext {
        self.ctx
    }

    fn database(&self) -> &Database<B> {
        self.db
    }

    fn metadata(&self) -> Option<JsonBlob> {
        self.metadata.clone()
    }
}

impl<B: EntityOps<E>, E: Entity> CreateCommand for CreateEntity<'_, B, E> {
    type Row = E;

    fn action(&self) -> Action {
        self.action.clone()
    }

    fn execute(&self, tx: &mut Tx<'_, B>) -> Result<E> {
        B::insert(tx, &self.params)
    }

    fn record_id(&self, row: &E) -> RecordId {
        row.id().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Audited update of an `E`.
pub struct UpdateEntity<'a, B: Backend, E: Entity> {
    db: &'a Database<B>,
    ctx: &'a AuditContext,
    id: RecordId,
    params: E::UpdateParams,
    action: Action,
    metadata: Option<JsonBlob>,
}

impl<'a, B: EntityOps<E>, E: Entity> UpdateEntity<'a, B, E> {
    /// Build the command.
    pub fn new(
        db: &'a Database<B>,
        ctx: &'a AuditContext,
        id: RecordId,
        params: E::UpdateParams,
    ) -> Self {
        Self {
            db,
            ctx,
            id,
            params,
            action: Operation::Update.default_action(),
            metadata: None,
        }
    }

    /// Record a different semantic action (e.g. `Publish`).
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach caller metadata to the event.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonBlob) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl<B: EntityOps<E>, E: Entity> AuditedCommand for UpdateEntity<'_, B, E> {
    type Backend = B;

    fn table_name(&self) -> &str {
        E::TABLE
    }

    fn audit_context(&self) -> &AuditContext {
        self.ctx
    }

    fn database(&self) -> &Database<B> {
        self.db
    }

    fn metadata(&self) -> Option<JsonBlob> {
        self.metadata.clone()
    }
}

impl<B: EntityOps<E>, E: Entity> UpdateCommand for UpdateEntity<'_, B, E> {
    type Row = E;
    type Params = E::UpdateParams;

    fn action(&self) -> Action {
        self.action.clone()
    }

    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn params(&self) -> &E::UpdateParams {
        &self.params
    }

    fn get_before(&self, tx: &mut Tx<'_, B>) -> Result<Option<E>> {
        B::get(tx, &self.id)
    }

    fn execute(&self, tx: &mut Tx<'_, B>) -> Result<()> {
        let changed = B::update(tx, &self.id, &self.params)?;
        expect_one(changed, E::TABLE, &self.id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete
// ─────────────────────────────────────────────────────────────────────────────

/// Audited delete of an `E`.
pub struct DeleteEntity<'a, B: Backend, E: Entity> {
    db: &'a Database<B>,
    ctx: &'a AuditContext,
    id: RecordId,
    action: Action,
    metadata: Option<JsonBlob>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, B: EntityOps<E>, E: Entity> DeleteEntity<'a, B, E> {
    /// Build the command.
    pub fn new(db: &'a Database<B>, ctx: &'a AuditContext, id: RecordId) -> Self {
        Self {
            db,
            ctx,
            id,
            action: Operation::Delete.default_action(),
            metadata: None,
            _entity: PhantomData,
        }
    }

    /// Record a different semantic action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach caller metadata to the event.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonBlob) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl<B: EntityOps<E>, E: Entity> AuditedCommand for DeleteEntity<'_, B, E> {
    type Backend = B;

    fn table_name(&self) -> &str {
        E::TABLE
    }

    fn audit_context(&self) -> &AuditContext {
        self.ctx
    }

    fn database(&self) -> &Database<B> {
        self.db
    }

    fn metadata(&self) -> Option<JsonBlob> {
        self.metadata.clone()
    }
}

impl<B: EntityOps<E>, E: Entity> DeleteCommand for DeleteEntity<'_, B, E> {
    type Row = E;

    fn action(&self) -> Action {
        self.action.clone()
    }

    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn get_before(&self, tx: &mut Tx<'_, B>) -> Result<Option<E>> {
        B::get(tx, &self.id)
    }

    fn execute(&self, tx: &mut Tx<'_, B>) -> Result<()> {
        let changed = B::delete(tx, &self.id)?;
        expect_one(changed, E::TABLE, &self.id)
    }
}
