//! # folio-settings
//!
//! Configuration management with layered sources for the Folio data layer.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`FolioSettings::default()`]
//! 2. **User file** — `~/.folio/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `FOLIO_*` overrides (highest priority)
//!
//! Settings are loaded explicitly and passed to whoever builds the
//! database handle; there is no global settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use folio_core::logging::{init_json_subscriber, init_subscriber};
use folio_core::{AuditContext, NodeId};

impl FolioSettings {
    /// The configured node ID, or a freshly generated one.
    #[must_use]
    pub fn resolve_node_id(&self) -> NodeId {
        self.node_id
            .clone()
            .map_or_else(NodeId::generate, NodeId::from)
    }

    /// System audit context for this node.
    ///
    /// Without a configured `nodeId` every call generates a new one, so build
    /// this once at startup and derive per-request contexts from it.
    #[must_use]
    pub fn audit_context(&self) -> AuditContext {
        AuditContext::system(self.resolve_node_id())
    }
}

impl LoggingSettings {
    /// Install the global `tracing` subscriber at `level`. No-op if one is
    /// already installed.
    pub fn init(&self) {
        if self.json {
            init_json_subscriber(&self.level);
        } else {
            init_subscriber(&self.level);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = FolioSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn configured_node_id_is_used() {
        let settings = FolioSettings {
            node_id: Some("edge-7".into()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_node_id().as_str(), "edge-7");
    }

    #[test]
    fn audit_context_uses_configured_node() {
        let settings = FolioSettings {
            node_id: Some("edge-7".into()),
            ..Default::default()
        };
        let ctx = settings.audit_context();
        assert_eq!(ctx.node_id.as_str(), "edge-7");
        assert!(ctx.is_system());
    }

    #[test]
    fn logging_init_is_repeatable() {
        LoggingSettings::default().init();
        LoggingSettings {
            level: "debug".into(),
            json: true,
        }
        .init();
    }

    #[test]
    fn missing_node_id_is_generated() {
        let settings = FolioSettings::default();
        let a = settings.resolve_node_id();
        assert_eq!(a.len(), folio_core::ULID_LEN);
    }
}
