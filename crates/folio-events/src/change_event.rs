//! Change-event value types.
//!
//! A [`ChangeEvent`] is one immutable row of the audit log. Callers build a
//! [`ChangeEventParams`] (identity, timestamps, payloads) and hand it to a
//! recorder or store; the two lifecycle flags (`synced_at`, `consumed_at`)
//! start unset and are only ever set by the mark operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use folio_core::time::truncate_ms;
use folio_core::{AuditContext, EventId, Hlc, NodeId, RecordId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Storage-level operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Row inserted.
    Insert,
    /// Row updated.
    Update,
    /// Row deleted.
    Delete,
}

impl Operation {
    /// Column value (`INSERT`, `UPDATE`, `DELETE`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// The action recorded when a command does not override it.
    #[must_use]
    pub fn default_action(self) -> Action {
        match self {
            Self::Insert => Action::Create,
            Self::Update => Action::Update,
            Self::Delete => Action::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(StoreError::Decode(format!("unknown operation: {other}"))),
        }
    }
}

/// Semantic action. May differ from the storage [`Operation`]: publishing
/// content is an `Update` at storage level but a `Publish` action.
///
/// Built-in names always parse to their own variant, so an action reads
/// back from any backend exactly as it was written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Action {
    /// Entity created.
    Create,
    /// Entity updated.
    Update,
    /// Entity deleted.
    Delete,
    /// Entity made publicly visible.
    Publish,
    /// Entity withdrawn from public view.
    Archive,
    /// Application-defined action. Built with [`Action::custom`].
    Custom(CustomAction),
}

/// Name of an application-defined action; never a built-in name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CustomAction(String);

impl CustomAction {
    /// The action name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Action {
    /// Action named `name`: a built-in variant when the name is one,
    /// otherwise [`Action::Custom`].
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "publish" => Self::Publish,
            "archive" => Self::Archive,
            _ => Self::Custom(CustomAction(name)),
        }
    }

    /// Column value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Archive => "archive",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        Self::custom(s)
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self::custom(s)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_owned()
    }
}

/// Opaque serialized JSON payload.
///
/// The log stores and returns these bytes unchanged and never interprets
/// them. Backends persist the text as-is, so a blob read back compares
/// equal to the blob written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonBlob(String);

impl JsonBlob {
    /// Serialize a value into a blob.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_string(value).map(Self)
    }

    /// Wrap text already known to hold JSON (e.g. read from a column).
    #[must_use]
    pub fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    /// The raw JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Deserialize the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.0)
    }
}

impl From<serde_json::Value> for JsonBlob {
    fn from(value: serde_json::Value) -> Self {
        Self(value.to_string())
    }
}

/// Everything needed to write one change event.
///
/// `event_id`, `hlc_timestamp` and `wall_timestamp` are assigned by the
/// caller; stores and recorders never generate them. `wall_timestamp` is
/// stored at millisecond precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventParams {
    /// Primary key.
    pub event_id: EventId,
    /// Causal ordering key.
    pub hlc_timestamp: Hlc,
    /// Wall-clock time of the mutation. Informational, never used to order.
    pub wall_timestamp: DateTime<Utc>,
    /// Node that performed the mutation.
    pub node_id: NodeId,
    /// Mutated table.
    pub table_name: String,
    /// Mutated row.
    pub record_id: RecordId,
    /// Storage-level operation.
    pub operation: Operation,
    /// Semantic action.
    pub action: Action,
    /// Acting user; `None` for system mutations.
    pub user_id: Option<UserId>,
    /// Originating request correlation ID.
    pub request_id: Option<String>,
    /// Originating client IP.
    pub ip: Option<String>,
    /// Row before the mutation.
    pub old_values: Option<JsonBlob>,
    /// Row (or update parameters) after the mutation.
    pub new_values: Option<JsonBlob>,
    /// Free-form caller metadata.
    pub metadata: Option<JsonBlob>,
}

impl ChangeEventParams {
    /// Params for a mutation made under `ctx`: fresh event ID, current wall
    /// time, the operation's default action, provenance copied from `ctx`
    /// and no payloads.
    #[must_use]
    pub fn new(
        ctx: &AuditContext,
        hlc_timestamp: Hlc,
        table_name: impl Into<String>,
        record_id: RecordId,
        operation: Operation,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            hlc_timestamp,
            wall_timestamp: folio_core::time::now_ms(),
            node_id: ctx.node_id.clone(),
            table_name: table_name.into(),
            record_id,
            operation,
            action: operation.default_action(),
            user_id: ctx.user_id.clone(),
            request_id: ctx.request_id.clone(),
            ip: ctx.ip.clone(),
            old_values: None,
            new_values: None,
            metadata: None,
        }
    }
}

/// A persisted change event.
///
/// Converting [`ChangeEventParams`] into an event yields the row a backend
/// stores for them: wall time at millisecond precision, both flags unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Primary key.
    pub event_id: EventId,
    /// Causal ordering key.
    pub hlc_timestamp: Hlc,
    /// Wall-clock time of the mutation.
    pub wall_timestamp: DateTime<Utc>,
    /// Node that performed the mutation.
    pub node_id: NodeId,
    /// Mutated table.
    pub table_name: String,
    /// Mutated row.
    pub record_id: RecordId,
    /// Storage-level operation.
    pub operation: Operation,
    /// Semantic action.
    pub action: Action,
    /// Acting user.
    pub user_id: Option<UserId>,
    /// Originating request correlation ID.
    pub request_id: Option<String>,
    /// Originating client IP.
    pub ip: Option<String>,
    /// Row before the mutation.
    pub old_values: Option<JsonBlob>,
    /// Row (or update parameters) after the mutation.
    pub new_values: Option<JsonBlob>,
    /// Free-form caller metadata.
    pub metadata: Option<JsonBlob>,
    /// When the event was replicated to peers.
    pub synced_at: Option<DateTime<Utc>>,
    /// When the event was delivered to downstream subscribers.
    pub consumed_at: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    /// Whether the event has been replicated.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced_at.is_some()
    }

    /// Whether the event has been delivered.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

impl From<ChangeEventParams> for ChangeEvent {
    fn from(p: ChangeEventParams) -> Self {
        Self {
            event_id: p.event_id,
            hlc_timestamp: p.hlc_timestamp,
            wall_timestamp: truncate_ms(p.wall_timestamp),
            node_id: p.node_id,
            table_name: p.table_name,
            record_id: p.record_id,
            operation: p.operation,
            action: p.action,
            user_id: p.user_id,
            request_id: p.request_id,
            ip: p.ip,
            old_values: p.old_values,
            new_values: p.new_values,
            metadata: p.metadata,
            synced_at: None,
            consumed_at: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn operation_parses_column_values() {
        for op in [Operation::Insert, Operation::Update, Operation::Delete] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert_matches!("UPSERT".parse::<Operation>(), Err(StoreError::Decode(_)));
    }

    #[test]
    fn default_actions() {
        assert_eq!(Operation::Insert.default_action(), Action::Create);
        assert_eq!(Operation::Update.default_action(), Action::Update);
        assert_eq!(Operation::Delete.default_action(), Action::Delete);
    }

    #[test]
    fn action_known_and_custom() {
        assert_eq!(Action::from("publish"), Action::Publish);
        assert_matches!(Action::from("restore"), Action::Custom(ref c) if c.as_str() == "restore");
        assert_eq!(Action::custom("restore").as_str(), "restore");
    }

    #[test]
    fn custom_with_builtin_name_is_the_builtin() {
        assert_eq!(Action::custom("create"), Action::Create);
        assert_eq!(Action::custom(String::from("archive")), Action::Archive);
    }

    #[test]
    fn action_serializes_as_plain_string() {
        assert_eq!(serde_json::to_value(Action::Archive).unwrap(), json!("archive"));
        let back: Action = serde_json::from_value(json!("merge")).unwrap();
        assert_eq!(back, Action::custom("merge"));
    }

    #[test]
    fn json_blob_keeps_text_verbatim() {
        let raw = r#"{"b":1,"a":2}"#.to_string();
        let blob = JsonBlob::from_raw(raw.clone());
        assert_eq!(blob.as_str(), raw);
        let value: serde_json::Value = blob.decode().unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn json_blob_encode() {
        let blob = JsonBlob::encode(&json!({"username": "ada"})).unwrap();
        assert_eq!(blob.as_str(), r#"{"username":"ada"}"#);
    }

    #[test]
    fn new_params_take_provenance_from_context() {
        let user = UserId::new();
        let ctx = AuditContext::system(NodeId::from("node-1"))
            .with_user(user.clone())
            .with_request_id("req-1")
            .with_ip("192.0.2.1");
        let params = ChangeEventParams::new(&ctx, Hlc::new(1, 0), "users", RecordId::new(), Operation::Delete);

        assert_eq!(params.node_id.as_str(), "node-1");
        assert_eq!(params.user_id, Some(user));
        assert_eq!(params.request_id.as_deref(), Some("req-1"));
        assert_eq!(params.ip.as_deref(), Some("192.0.2.1"));
        assert_eq!(params.action, Action::Delete);
        assert!(params.old_values.is_none() && params.new_values.is_none());

        let event = ChangeEvent::from(params);
        assert!(!event.is_synced());
        assert!(!event.is_consumed());
    }

    #[test]
    fn event_from_params_truncates_wall_time_to_millis() {
        let precise = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let params = ChangeEventParams {
            event_id: EventId::new(),
            hlc_timestamp: Hlc::new(1, 0),
            wall_timestamp: precise,
            node_id: NodeId::from("node-1"),
            table_name: "users".into(),
            record_id: RecordId::new(),
            operation: Operation::Insert,
            action: Action::Create,
            user_id: None,
            request_id: None,
            ip: None,
            old_values: None,
            new_values: None,
            metadata: None,
        };
        let event = ChangeEvent::from(params);
        assert_eq!(event.wall_timestamp.timestamp_subsec_nanos(), 123_000_000);
    }
}
