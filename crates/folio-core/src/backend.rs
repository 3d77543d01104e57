//! SQL backend discriminator shared by settings and the event engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three supported SQL backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded `SQLite`.
    #[default]
    Sqlite,
    /// `PostgreSQL`.
    Postgres,
    /// `MySQL` / `MariaDB`.
    #[serde(rename = "mysql")]
    MySql,
}

impl BackendKind {
    /// All backends in declaration order.
    pub const ALL: [BackendKind; 3] = [Self::Sqlite, Self::Postgres, Self::MySql];

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}
