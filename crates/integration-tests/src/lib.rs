//! Integration tests for the CampusTrade admin console.
//!
//! The test doubles live here: [`MockBackend`] implements the full gateway
//! contract over in-memory tables with per-operation failure injection, and
//! [`RecordingSms`] captures outbound notifications. The tests themselves
//! live under `tests/` and drive whole workflows through the public API.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use campus_trade_admin::backend::{AdminBackend, ApplicationStatusUpdate, BackendError};
use campus_trade_admin::models::{
    ActivityLogDraft, Identity, PlatformSetting, SellerApplication, SellerProfileDraft,
};
use campus_trade_admin::services::{SmsError, SmsMessage, SmsSender};
use campus_trade_core::{ApplicationId, ApplicationStatus, IdentityId, Phone, Role};

/// In-memory tables behind [`MockBackend`].
#[derive(Debug, Default)]
pub struct MockState {
    pub identities: Vec<Identity>,
    pub applications: Vec<SellerApplication>,
    /// Upserted profiles, at most one per identity id.
    pub profiles: Vec<SellerProfileDraft>,
    pub activity: Vec<ActivityLogDraft>,
    pub settings: Vec<PlatformSetting>,
    pub products_total: u64,
    pub products_active: u64,
    pub signups: Vec<DateTime<Utc>>,
    pub departments: Vec<String>,
    failing: HashSet<String>,
}

/// Gateway double: every operation works against [`MockState`], and any
/// operation can be made to fail by name.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Run a closure over the in-memory tables (seed or inspect).
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.inner.lock().expect("mock state lock poisoned");
        f(&mut guard)
    }

    /// Make one operation fail with a server error from now on.
    pub fn fail_on(&self, operation: &str) {
        self.with_state(|s| {
            s.failing.insert(operation.to_string());
        });
    }

    fn check(&self, operation: &str) -> Result<(), BackendError> {
        let failing = self.with_state(|s| s.failing.contains(operation));
        if failing {
            Err(BackendError::Api {
                status: 500,
                message: format!("{operation} unavailable"),
            })
        } else {
            Ok(())
        }
    }
}

impl AdminBackend for MockBackend {
    async fn fetch_identity(&self, id: IdentityId) -> Result<Identity, BackendError> {
        self.check("fetch_identity")?;
        self.with_state(|s| {
            s.identities
                .iter()
                .find(|i| i.id == id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(format!("identity {id}")))
        })
    }

    async fn update_identity_role(&self, id: IdentityId, role: Role) -> Result<(), BackendError> {
        self.check("update_identity_role")?;
        self.with_state(|s| {
            let identity = s
                .identities
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| BackendError::NotFound(format!("identity {id}")))?;
            identity.role = role;
            Ok(())
        })
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<SellerApplication>, BackendError> {
        self.check("list_applications")?;
        self.with_state(|s| {
            Ok(s.applications
                .iter()
                .filter(|a| status.is_none_or(|wanted| a.status == wanted))
                .cloned()
                .collect())
        })
    }

    async fn update_application_status(
        &self,
        update: &ApplicationStatusUpdate,
    ) -> Result<(), BackendError> {
        self.check("update_application_status")?;
        self.with_state(|s| {
            let app = s
                .applications
                .iter_mut()
                .find(|a| a.id == update.id)
                .ok_or_else(|| BackendError::NotFound(format!("application {}", update.id)))?;
            app.status = update.status;
            app.reviewed_at = Some(update.reviewed_at);
            app.reviewer_id = update.reviewer_id;
            app.updated_at = update.reviewed_at;
            Ok(())
        })
    }

    async fn upsert_seller_profile(
        &self,
        profile: &SellerProfileDraft,
    ) -> Result<(), BackendError> {
        self.check("upsert_seller_profile")?;
        self.with_state(|s| {
            if let Some(existing) = s
                .profiles
                .iter_mut()
                .find(|p| p.identity_id == profile.identity_id)
            {
                *existing = profile.clone();
            } else {
                s.profiles.push(profile.clone());
            }
            Ok(())
        })
    }

    async fn insert_activity_log(&self, entry: &ActivityLogDraft) -> Result<(), BackendError> {
        self.check("insert_activity_log")?;
        self.with_state(|s| {
            s.activity.push(entry.clone());
            Ok(())
        })
    }

    async fn set_platform_setting(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> Result<(), BackendError> {
        self.check("set_platform_setting")?;
        self.with_state(|s| {
            if let Some(existing) = s.settings.iter_mut().find(|row| row.key == key) {
                existing.value = value.clone();
            } else {
                s.settings.push(PlatformSetting {
                    key: key.to_string(),
                    value: value.clone(),
                });
            }
            Ok(())
        })
    }

    async fn list_platform_settings(&self) -> Result<Vec<PlatformSetting>, BackendError> {
        self.check("list_platform_settings")?;
        self.with_state(|s| Ok(s.settings.clone()))
    }

    async fn count_identities_with_roles(&self, roles: &[Role]) -> Result<u64, BackendError> {
        self.check("count_identities_with_roles")?;
        self.with_state(|s| {
            Ok(s.identities
                .iter()
                .filter(|i| roles.contains(&i.role))
                .count() as u64)
        })
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64, BackendError> {
        self.check("count_applications")?;
        self.with_state(|s| {
            Ok(s.applications
                .iter()
                .filter(|a| a.status == status)
                .count() as u64)
        })
    }

    async fn count_products(&self, active_only: bool) -> Result<u64, BackendError> {
        self.check("count_products")?;
        self.with_state(|s| {
            Ok(if active_only {
                s.products_active
            } else {
                s.products_total
            })
        })
    }

    async fn recent_signups(&self, days: u32) -> Result<Vec<DateTime<Utc>>, BackendError> {
        self.check("recent_signups")?;
        let since = Utc::now() - chrono::Duration::days(i64::from(days));
        self.with_state(|s| Ok(s.signups.iter().filter(|ts| **ts >= since).copied().collect()))
    }

    async fn list_departments(&self) -> Result<Vec<String>, BackendError> {
        self.check("list_departments")?;
        self.with_state(|s| Ok(s.departments.clone()))
    }
}

/// SMS double: records every send, optionally failing them all.
#[derive(Debug, Clone, Default)]
pub struct RecordingSms {
    sent: Arc<Mutex<Vec<(Vec<Phone>, SmsMessage)>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingSms {
    /// Everything sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<(Vec<Phone>, SmsMessage)> {
        self.sent.lock().expect("sms lock poisoned").clone()
    }

    /// Make every subsequent send fail.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn fail_all(&self) {
        *self.failing.lock().expect("sms lock poisoned") = true;
    }
}

impl SmsSender for RecordingSms {
    async fn send(&self, to: &[Phone], message: &SmsMessage) -> Result<(), SmsError> {
        if *self.failing.lock().expect("sms lock poisoned") {
            return Err(SmsError::Api("provider down".to_string()));
        }
        self.sent
            .lock()
            .expect("sms lock poisoned")
            .push((to.to_vec(), message.clone()));
        Ok(())
    }
}

/// Identity fixture.
#[must_use]
pub fn identity(n: u128, role: Role, display_name: &str) -> Identity {
    Identity {
        id: IdentityId::new(Uuid::from_u128(n)),
        role,
        display_name: display_name.to_string(),
        phone: None,
        email: None,
        department: None,
        created_at: Utc::now(),
    }
}

/// Pending application fixture for the given applicant.
#[must_use]
pub fn pending_application(id: i64, applicant: IdentityId, business_name: &str) -> SellerApplication {
    SellerApplication {
        id: ApplicationId::new(id),
        applicant_id: applicant,
        business_name: business_name.to_string(),
        category: "Food".to_string(),
        description: String::new(),
        contact_phone: None,
        contact_email: None,
        status: ApplicationStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        reviewed_at: None,
        reviewer_id: None,
        rejection_reason: None,
    }
}
