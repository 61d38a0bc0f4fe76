//! Status enums for marketplace entities.

use serde::{Deserialize, Serialize};

/// Seller application review status.
///
/// Transitions are one-directional: `pending` may become `approved`,
/// `rejected`, or `cancelled`, and none of those go back (the only exception
/// is the in-memory optimistic revert to `pending` when a persistence step
/// fails, which never reaches the backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Approved by an administrator; terminal.
    Approved,
    /// Rejected by an administrator; terminal.
    Rejected,
    /// Withdrawn by the applicant; terminal.
    Cancelled,
}

impl ApplicationStatus {
    /// Whether the status admits no further review action.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Canonical backend string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_reviewable() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Approved.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_round_trips_through_backend_string() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }
}
