//! Append-only activity log entries.

use campus_trade_core::IdentityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Action type tag for activity log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ApplicationApproved,
    ApplicationRejected,
    SettingChanged,
}

impl ActionKind {
    /// Canonical backend string for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::SettingChanged => "setting_changed",
        }
    }
}

/// A new activity log entry.
///
/// Entries are append-only: never mutated or deleted by this console, and a
/// failed write is never fatal to the workflow that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogDraft {
    /// Acting administrator, when attributable.
    pub actor_id: Option<IdentityId>,
    pub action: ActionKind,
    /// Structured detail payload.
    pub detail: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogDraft {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(actor_id: Option<IdentityId>, action: ActionKind, detail: JsonValue) -> Self {
        Self {
            actor_id,
            action,
            detail,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_match_the_backend_strings() {
        assert_eq!(ActionKind::ApplicationApproved.as_str(), "application_approved");
        assert_eq!(ActionKind::ApplicationRejected.as_str(), "application_rejected");
        assert_eq!(ActionKind::SettingChanged.as_str(), "setting_changed");
    }
}
