//! [`EntityOps`] for the `SQLite` backend.

use folio_core::RecordId;
use rusqlite::Transaction;

use super::{PooledConnection, Sqlite};
use super::repositories::{ContentRepo, UserRepo};
use crate::audited::EntityOps;
use crate::entities::content::{
    ContentData, SqliteCreateContentParams, SqliteUpdateContentParams,
};
use crate::entities::users::{SqliteCreateUserParams, SqliteUpdateUserParams, User};
use crate::entities::{
    CreateContentParams, CreateUserParams, FromCanonical, IntoCanonical, UpdateContentParams,
    UpdateUserParams,
};
use crate::errors::Result;

impl EntityOps<User> for Sqlite {
    fn insert(tx: &mut Transaction<'_>, params: &CreateUserParams) -> Result<User> {
        let params = SqliteCreateUserParams::from_canonical(params)?;
        UserRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConnection, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(tx: &mut Transaction<'_>, id: &RecordId, params: &UpdateUserParams) -> Result<u64> {
        UserRepo::update(tx, id, &SqliteUpdateUserParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        UserRepo::delete(tx, id)
    }
}

impl EntityOps<ContentData> for Sqlite {
    fn insert(tx: &mut Transaction<'_>, params: &CreateContentParams) -> Result<ContentData> {
        let params = SqliteCreateContentParams::from_canonical(params)?;
        ContentRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConnection, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(
        tx: &mut Transaction<'_>,
        id: &RecordId,
        params: &UpdateContentParams,
    ) -> Result<u64> {
        ContentRepo::update(tx, id, &SqliteUpdateContentParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        ContentRepo::delete(tx, id)
    }
}
