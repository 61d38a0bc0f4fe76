//! Provisioned seller profiles.

use campus_trade_core::{IdentityId, Phone};
use serde::{Deserialize, Serialize};

use super::application::SellerApplication;

/// Business name used when an application left the field empty.
const DEFAULT_BUSINESS_NAME: &str = "New Business";

/// Category used when an application left the field empty.
const DEFAULT_CATEGORY: &str = "General";

/// A seller profile as written to the backend.
///
/// Keyed by the applicant's identity id - at most one per identity, so the
/// write is always an upsert on that key. Created only as a side effect of
/// application approval; never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerProfileDraft {
    pub identity_id: IdentityId,
    pub business_name: String,
    pub category: String,
    pub description: String,
    pub contact_phone: Option<Phone>,
    pub contact_email: Option<String>,
    pub active: bool,
}

impl SellerProfileDraft {
    /// Build the profile provisioned when an application is approved.
    ///
    /// Empty business name, category, and description fall back to defaults;
    /// the description default greets with the (defaulted) business name.
    #[must_use]
    pub fn from_application(app: &SellerApplication) -> Self {
        let business_name = if app.business_name.trim().is_empty() {
            DEFAULT_BUSINESS_NAME.to_string()
        } else {
            app.business_name.clone()
        };
        let category = if app.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            app.category.clone()
        };
        let description = if app.description.trim().is_empty() {
            format!("Welcome to {business_name}!")
        } else {
            app.description.clone()
        };

        Self {
            identity_id: app.applicant_id,
            business_name,
            category,
            description,
            contact_phone: app.contact_phone.clone(),
            contact_email: app.contact_email.clone(),
            active: true,
        }
    }
}
