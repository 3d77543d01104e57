//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FolioSettings::default()`]
//! 2. If `~/.folio/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `FOLIO_*` environment variable overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use folio_core::BackendKind;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::FolioSettings;

/// Resolve the path to the settings file (`~/.folio/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".folio").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FolioSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FolioSettings> {
    let defaults = serde_json::to_value(FolioSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FolioSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut FolioSettings) {
    if let Some(v) = read_env_string("FOLIO_NODE_ID") {
        settings.node_id = Some(v);
    }
    if let Some(v) = read_env_backend("FOLIO_DB_BACKEND") {
        settings.database.backend = v;
    }
    if let Some(v) = read_env_string("FOLIO_DB_URL") {
        settings.database.url = v;
    }
    if let Some(v) = read_env_u32("FOLIO_DB_POOL_SIZE", 1, 1024) {
        settings.database.pool_size = v;
    }
    if let Some(v) = read_env_string("FOLIO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_u32("FOLIO_BATCH_SIZE", 1, 100_000) {
        settings.lifecycle.batch_size = v;
    }
}

/// Reject settings no backend can run with.
pub fn validate(settings: &FolioSettings) -> Result<()> {
    if settings.database.pool_size == 0 {
        return Err(SettingsError::Invalid {
            field: "database.poolSize",
            reason: "must be at least 1",
        });
    }
    if settings.database.url.trim().is_empty() {
        return Err(SettingsError::Invalid {
            field: "database.url",
            reason: "must not be empty",
        });
    }
    if settings.lifecycle.batch_size == 0 {
        return Err(SettingsError::Invalid {
            field: "lifecycle.batchSize",
            reason: "must be at least 1",
        });
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_backend(name: &str) -> Option<BackendKind> {
    let val = std::env::var(name).ok()?;
    match val.parse() {
        Ok(kind) => Some(kind),
        Err(_) => {
            tracing::warn!(key = name, value = %val, "invalid backend env var, ignoring");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_objects_recursively() {
        let target = json!({"database": {"url": "a.db", "poolSize": 16}});
        let source = json!({"database": {"url": "b.db"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["database"]["url"], "b.db");
        assert_eq!(merged["database"]["poolSize"], 16);
    }

    #[test]
    fn deep_merge_skips_null() {
        let merged = deep_merge(json!({"x": 1}), json!({"x": null}));
        assert_eq!(merged["x"], 1);
    }

    #[test]
    fn deep_merge_replaces_primitives() {
        let merged = deep_merge(json!({"x": [1, 2]}), json!({"x": [3]}));
        assert_eq!(merged["x"], json!([3]));
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.database.backend, BackendKind::Sqlite);
        assert_eq!(settings.database.pool_size, 16);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"nodeId": "edge-1", "database": {"backend": "postgres", "url": "host=db"}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.node_id.as_deref(), Some("edge-1"));
        assert_eq!(settings.database.backend, BackendKind::Postgres);
        assert_eq!(settings.database.url, "host=db");
        assert_eq!(settings.database.busy_timeout_ms, 30_000);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"database": {"poolSize": 0}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Invalid { .. })
        ));
    }

    #[test]
    fn parse_u32_range_bounds() {
        assert_eq!(parse_u32_range("8", 1, 16), Some(8));
        assert_eq!(parse_u32_range("0", 1, 16), None);
        assert_eq!(parse_u32_range("17", 1, 16), None);
        assert_eq!(parse_u32_range("abc", 1, 16), None);
    }
}
