//! Ambient per-request audit metadata.

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, UserId};

/// Identity and provenance attached verbatim to every change event.
///
/// Built once per request and threaded through every mutating call.
/// `user_id` is `None` for system-initiated mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditContext {
    /// Node performing the mutation.
    pub node_id: NodeId,
    /// Acting user, if any.
    pub user_id: Option<UserId>,
    /// Correlation ID of the originating request.
    pub request_id: Option<String>,
    /// Client IP address of the originating request.
    pub ip: Option<String>,
}

impl AuditContext {
    /// Context for a system-initiated mutation on `node_id`.
    #[must_use]
    pub fn system(node_id: NodeId) -> Self {
        Self {
            node_id,
            user_id: None,
            request_id: None,
            ip: None,
        }
    }

    /// Set the acting user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the request correlation ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the client IP address.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Whether the mutation was initiated without a user.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}
