//! [`EntityOps`] for the `MySQL` backend.

use ::mysql::{PooledConn, Transaction};
use folio_core::RecordId;

use super::MySql;
use super::repositories::{ContentRepo, UserRepo};
use crate::audited::EntityOps;
use crate::entities::content::{
    ContentData, MySqlCreateContentParams, MySqlUpdateContentParams,
};
use crate::entities::users::{MySqlCreateUserParams, MySqlUpdateUserParams, User};
use crate::entities::{
    CreateContentParams, CreateUserParams, FromCanonical, IntoCanonical, UpdateContentParams,
    UpdateUserParams,
};
use crate::errors::Result;

impl EntityOps<User> for MySql {
    fn insert(tx: &mut Transaction<'_>, params: &CreateUserParams) -> Result<User> {
        let params = MySqlCreateUserParams::from_canonical(params)?;
        UserRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConn, id: &RecordId) -> Result<Option<User>> {
        UserRepo::get_by_id(conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(tx: &mut Transaction<'_>, id: &RecordId, params: &UpdateUserParams) -> Result<u64> {
        UserRepo::update(tx, id, &MySqlUpdateUserParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        UserRepo::delete(tx, id)
    }
}

impl EntityOps<ContentData> for MySql {
    fn insert(tx: &mut Transaction<'_>, params: &CreateContentParams) -> Result<ContentData> {
        let params = MySqlCreateContentParams::from_canonical(params)?;
        ContentRepo::insert(tx, &params)?.into_canonical()
    }

    fn get(tx: &mut Transaction<'_>, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(tx, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn find(conn: &mut PooledConn, id: &RecordId) -> Result<Option<ContentData>> {
        ContentRepo::get_by_id(conn, id)?
            .map(IntoCanonical::into_canonical)
            .transpose()
    }

    fn update(
        tx: &mut Transaction<'_>,
        id: &RecordId,
        params: &UpdateContentParams,
    ) -> Result<u64> {
        ContentRepo::update(tx, id, &MySqlUpdateContentParams::from_canonical(params)?)
    }

    fn delete(tx: &mut Transaction<'_>, id: &RecordId) -> Result<u64> {
        ContentRepo::delete(tx, id)
    }
}
