//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid JSON, or does not fit [`FolioSettings`](crate::FolioSettings).
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// A field holds a value no backend can run with.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted camelCase path, e.g. `database.poolSize`.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/folio/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/folio/settings.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn invalid_names_the_field() {
        let err = SettingsError::Invalid {
            field: "database.poolSize",
            reason: "must be at least 1",
        };
        assert_eq!(err.to_string(), "database.poolSize: must be at least 1");
    }
}
