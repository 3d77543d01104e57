//! [`EntityOps`] for the `PostgreSQL` backend.

use ::postgres::Transaction;
use folio_core::RecordId;

use super::{PooledConnection, Postgres};
use super::repositories::{ContentRepo, UserRepo};
use crate::audited::EntityOps;
use crate::entities::content::{
    ContentData, PostgresCreateContentParams, PostgresUpdateContentParams,
};
use crate::entities::users::{PostgresCreateUserParams, PostgresUpdateUserParams, User};
use crate::entities::{
    CreateContentParams, CreateUserParams, FromCanonical, IntoCanonical, UpdateContentParams,
    UpdateUserParams,
};
use crate::errors::Result;

impl EntityOps<User> for Postgres {
    fn insert(tx: &mut Transaction<'_>, params: &CreateUserParams) -> Result<User> {
        let params = PostgresCreateUserParams::from_canonical(params)?;
        UserRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConnection, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(&mut **conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(tx: &mut Transaction<'_>, id: &RecordId, params: &UpdateUserParams) -> Result<u64> {
        UserRepo::update(tx, id, &PostgresUpdateUserParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        UserRepo::delete(tx, id)
    }
}

impl EntityOps<ContentData> for Postgres {
    fn insert(tx: &mut Transaction<'_>, params: &CreateContentParams) -> Result<ContentData> {
        let params = PostgresCreateContentParams::from_canonical(params)?;
        ContentRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConnection, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(&mut **conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(
        tx: &mut Transaction<'_>,
        id: &RecordId,
        params: &UpdateContentParams,
    ) -> Result<u64> {
        ContentRepo::update(tx, id, &PostgresUpdateContentParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        ContentRepo::delete(tx, id)
    }
}
