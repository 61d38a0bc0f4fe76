//! Seller application records.

use campus_trade_core::{ApplicationId, ApplicationStatus, IdentityId, Phone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending (or reviewed) request to gain selling capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerApplication {
    pub id: ApplicationId,
    /// Identity of the applicant.
    pub applicant_id: IdentityId,
    pub business_name: String,
    pub category: String,
    pub description: String,
    pub contact_phone: Option<Phone>,
    pub contact_email: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when an administrator reviews the application.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewing administrator, when attributable.
    pub reviewer_id: Option<IdentityId>,
    /// Populated by the separate rejection-reason flow.
    pub rejection_reason: Option<String>,
}
