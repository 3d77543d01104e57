//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file may specify any subset of fields.

use folio_core::BackendKind;
use serde::{Deserialize, Serialize};

/// Root settings type for the Folio data layer.
///
/// # JSON Format
///
/// ```json
/// {
///   "nodeId": "edge-eu-1",
///   "database": { "backend": "postgres", "url": "host=db user=folio" },
///   "logging": { "level": "info" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolioSettings {
    /// Identity of this node in change events. Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Database connection settings.
    pub database: DatabaseSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Sync/consumption polling settings.
    pub lifecycle: LifecycleSettings,
}

/// Database connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Which SQL backend to use.
    pub backend: BackendKind,
    /// File path (`SQLite`) or connection string (`PostgreSQL`, `MySQL`).
    pub url: String,
    /// Maximum pool size.
    pub pool_size: u32,
    /// Busy timeout in milliseconds (`SQLite` only).
    pub busy_timeout_ms: u32,
    /// Page cache size in KiB (`SQLite` only).
    pub cache_size_kib: i64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            url: "folio.db".to_string(),
            pool_size: 16,
            busy_timeout_ms: 30_000,
            cache_size_kib: 8192,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive.
    pub level: String,
    /// Emit newline-delimited JSON instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

/// Sync/consumption polling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleSettings {
    /// Maximum events fetched per poll.
    pub batch_size: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: FolioSettings =
            serde_json::from_str(r#"{"database": {"backend": "mysql"}}"#).unwrap();
        assert_eq!(settings.database.backend, BackendKind::MySql);
        assert_eq!(settings.database.pool_size, 16);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.lifecycle.batch_size, 100);
        assert!(settings.node_id.is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(FolioSettings::default()).unwrap();
        assert!(json["database"].get("poolSize").is_some());
        assert!(json["database"].get("busyTimeoutMs").is_some());
        assert!(json.get("nodeId").is_none());
    }
}
