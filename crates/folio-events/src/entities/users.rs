//! `users` entity: canonical type and per-backend row/param types.

use chrono::{DateTime, Utc};
use folio_core::RecordId;
use serde::{Deserialize, Serialize};

use super::{Entity, FromCanonical, IntoCanonical, from_epoch_ms, narrow, record_id};
use crate::errors::Result;

/// Canonical user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Primary key.
    pub user_id: RecordId,
    /// Unique login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
    /// Creation time.
    pub date_created: DateTime<Utc>,
    /// Last modification time.
    pub date_modified: DateTime<Utc>,
}

/// Canonical create parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserParams {
    /// Unique login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
}

/// Canonical update parameters (full replacement of mutable fields).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserParams {
    /// Unique login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    type CreateParams = CreateUserParams;
    type UpdateParams = UpdateUserParams;

    fn id(&self) -> &RecordId {
        &self.user_id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite: 64-bit integers, chrono timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// `users` row as read by the `SQLite` driver.
#[derive(Clone, Debug)]
pub struct SqliteUserRow {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `SQLite` insert parameters.
#[derive(Clone, Debug)]
pub struct SqliteCreateUserParams {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `SQLite` update parameters.
#[derive(Clone, Debug)]
pub struct SqliteUpdateUserParams {
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i64,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

impl IntoCanonical for SqliteUserRow {
    type Canonical = User;

    fn into_canonical(self) -> Result<User> {
        Ok(User {
            user_id: record_id(self.user_id, "users.user_id")?,
            username: self.username,
            email: self.email,
            role: self.role,
            date_created: self.date_created,
            date_modified: self.date_modified,
        })
    }
}

impl FromCanonical<CreateUserParams> for SqliteCreateUserParams {
    fn from_canonical(p: &CreateUserParams) -> Result<Self> {
        let now = folio_core::time::now_ms();
        Ok(Self {
            user_id: RecordId::new().into_inner(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: p.role,
            date_created: now,
            date_modified: now,
        })
    }
}

impl FromCanonical<UpdateUserParams> for SqliteUpdateUserParams {
    fn from_canonical(p: &UpdateUserParams) -> Result<Self> {
        Ok(Self {
            username: p.username.clone(),
            email: p.email.clone(),
            role: p.role,
            date_modified: folio_core::time::now_ms(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL: INT role, TIMESTAMPTZ
// ─────────────────────────────────────────────────────────────────────────────

/// `users` row as read by the `PostgreSQL` driver.
#[derive(Clone, Debug)]
pub struct PostgresUserRow {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `PostgreSQL` insert parameters.
#[derive(Clone, Debug)]
pub struct PostgresCreateUserParams {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

/// `PostgreSQL` update parameters.
#[derive(Clone, Debug)]
pub struct PostgresUpdateUserParams {
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Last modification timestamp.
    pub date_modified: DateTime<Utc>,
}

impl IntoCanonical for PostgresUserRow {
    type Canonical = User;

    fn into_canonical(self) -> Result<User> {
        Ok(User {
            user_id: record_id(self.user_id, "users.user_id")?,
            username: self.username,
            email: self.email,
            role: i64::from(self.role),
            date_created: self.date_created,
            date_modified: self.date_modified,
        })
    }
}

impl FromCanonical<CreateUserParams> for PostgresCreateUserParams {
    fn from_canonical(p: &CreateUserParams) -> Result<Self> {
        let now = folio_core::time::now_ms();
        Ok(Self {
            user_id: RecordId::new().into_inner(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: narrow(p.role, "users.role")?,
            date_created: now,
            date_modified: now,
        })
    }
}

impl FromCanonical<UpdateUserParams> for PostgresUpdateUserParams {
    fn from_canonical(p: &UpdateUserParams) -> Result<Self> {
        Ok(Self {
            username: p.username.clone(),
            email: p.email.clone(),
            role: narrow(p.role, "users.role")?,
            date_modified: folio_core::time::now_ms(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MySQL: INT role, epoch-ms BIGINT timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// `users` row as read by the `MySQL` driver.
#[derive(Clone, Debug)]
pub struct MySqlUserRow {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Creation time, epoch milliseconds.
    pub date_created_ms: i64,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

/// `MySQL` insert parameters.
#[derive(Clone, Debug)]
pub struct MySqlCreateUserParams {
    /// User ID (ULID text).
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Creation time, epoch milliseconds.
    pub date_created_ms: i64,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

/// `MySQL` update parameters.
#[derive(Clone, Debug)]
pub struct MySqlUpdateUserParams {
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role code.
    pub role: i32,
    /// Last modification time, epoch milliseconds.
    pub date_modified_ms: i64,
}

impl IntoCanonical for MySqlUserRow {
    type Canonical = User;

    fn into_canonical(self) -> Result<User> {
        Ok(User {
            user_id: record_id(self.user_id, "users.user_id")?,
            username: self.username,
            email: self.email,
            role: i64::from(self.role),
            date_created: from_epoch_ms(self.date_created_ms, "users.date_created")?,
            date_modified: from_epoch_ms(self.date_modified_ms, "users.date_modified")?,
        })
    }
}

impl FromCanonical<CreateUserParams> for MySqlCreateUserParams {
    fn from_canonical(p: &CreateUserParams) -> Result<Self> {
        let now = folio_core::time::to_epoch_ms(folio_core::time::now_ms());
        Ok(Self {
            user_id: RecordId::new().into_inner(),
            username: p.username.clone(),
            email: p.email.clone(),
            role: narrow(p.role, "users.role")?,
            date_created_ms: now,
            date_modified_ms: now,
        })
    }
}

impl FromCanonical<UpdateUserParams> for MySqlUpdateUserParams {
    fn from_canonical(p: &UpdateUserParams) -> Result<Self> {
        Ok(Self {
            username: p.username.clone(),
            email: p.email.clone(),
            role: narrow(p.role, "users.role")?,
            date_modified_ms: folio_core::time::to_epoch_ms(folio_core::time::now_ms()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn create_params(role: i64) -> CreateUserParams {
        CreateUserParams {
            username: "ada".into(),
            email: "ada@example.com".into(),
            role,
        }
    }

    #[test]
    fn create_params_get_fresh_ids() {
        let p = create_params(1);
        let a = SqliteCreateUserParams::from_canonical(&p).unwrap();
        let b = SqliteCreateUserParams::from_canonical(&p).unwrap();
        assert_ne!(a.user_id, b.user_id);
        assert_eq!(a.user_id.len(), folio_core::ULID_LEN);

        let pg = PostgresCreateUserParams::from_canonical(&p).unwrap();
        let my = MySqlCreateUserParams::from_canonical(&p).unwrap();
        assert_ne!(pg.user_id, my.user_id);
    }

    #[test]
    fn wide_role_rejected_by_narrow_backends() {
        let p = create_params(i64::from(i32::MAX) + 1);
        assert!(SqliteCreateUserParams::from_canonical(&p).is_ok());
        assert_matches!(
            PostgresCreateUserParams::from_canonical(&p),
            Err(StoreError::ConstraintViolation(_))
        );
        assert_matches!(
            MySqlCreateUserParams::from_canonical(&p),
            Err(StoreError::ConstraintViolation(_))
        );
    }

    #[test]
    fn update_params_keep_values() {
        let p = UpdateUserParams {
            username: "grace".into(),
            email: "grace@example.com".into(),
            role: -3,
        };
        let pg = PostgresUpdateUserParams::from_canonical(&p).unwrap();
        assert_eq!(pg.role, -3);
        let my = MySqlUpdateUserParams::from_canonical(&p).unwrap();
        assert_eq!(my.username, "grace");
    }

    proptest! {
        #[test]
        fn all_backends_map_rows_identically(
            username in "[a-z]{1,16}",
            email in "[a-z]{1,8}@[a-z]{1,8}\\.com",
            role in any::<i32>(),
            created_ms in 0i64..4_102_444_800_000,
            modified_delta in 0i64..1_000_000_000,
        ) {
            let id = RecordId::new().into_inner();
            let created = folio_core::time::from_epoch_ms(created_ms).unwrap();
            let modified = folio_core::time::from_epoch_ms(created_ms + modified_delta).unwrap();

            let sqlite = SqliteUserRow {
                user_id: id.clone(),
                username: username.clone(),
                email: email.clone(),
                role: i64::from(role),
                date_created: created,
                date_modified: modified,
            }
            .into_canonical()
            .unwrap();
            let postgres = PostgresUserRow {
                user_id: id.clone(),
                username: username.clone(),
                email: email.clone(),
                role,
                date_created: created,
                date_modified: modified,
            }
            .into_canonical()
            .unwrap();
            let mysql = MySqlUserRow {
                user_id: id,
                username,
                email,
                role,
                date_created_ms: created_ms,
                date_modified_ms: created_ms + modified_delta,
            }
            .into_canonical()
            .unwrap();

            prop_assert_eq!(&sqlite, &postgres);
            prop_assert_eq!(&sqlite, &mysql);
        }
    }
}
