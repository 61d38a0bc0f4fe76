//! Seller-application approval workflow.
//!
//! The engine drives the multi-step approve/reject state machine. The
//! in-memory view flips optimistically before any backend confirmation so
//! the UI responds without delay; the flip returns its inverse command and
//! the engine applies that inverse only if a persistence step fails. The
//! backend's own record may have partially advanced by then - the design
//! accepts best-effort consistency and relies on a manual retry or refresh
//! to reconcile, not full atomicity.
//!
//! Step order for approval, each awaited before the next:
//!
//! 1. optimistic in-memory flip to `approved`
//! 2. persist the status transition (reviewer attributed only when the
//!    reviewer reference is syntactically valid)
//! 3. resolve the new role via the merge policy
//! 4. persist the merged role onto the applicant
//! 5. upsert the seller profile, keyed by applicant id
//! 6. best-effort activity log append
//! 7. best-effort SMS to the applicant, when a contact phone is present
//!
//! Failures in steps 2-5 revert step 1 and surface; failures in 6-7 are
//! swallowed and logged. A successful run ends by kicking the dashboard
//! refresh handle, when one is attached. Approving the same application
//! twice cannot double-provision (step 5 is an upsert); duplicate log
//! entries are the only observable artifact of such a race.

use std::sync::{Arc, RwLock};

use campus_trade_core::{ApplicationId, ApplicationStatus, IdentityId};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::backend::{AdminBackend, ApplicationStatusUpdate};
use crate::error::AppError;
use crate::models::{ActionKind, ActivityLogDraft, Identity, SellerApplication, SellerProfileDraft};

use super::activity::record_best_effort;
use super::sms::{SmsMessage, SmsSender};
use super::stats::RefreshHandle;

/// In-memory view of the application list backing the UI.
///
/// Mutated only from the cooperative task that issues the requests; the
/// lock is held for map/flip operations only, never across an await.
#[derive(Debug, Clone, Default)]
pub struct ApplicationStore {
    inner: Arc<RwLock<Vec<SellerApplication>>>,
}

/// Inverse of one optimistic status flip.
///
/// Produced by [`ApplicationStore::set_status`]; applying it restores the
/// previous status. The engine holds it for the duration of the persistence
/// steps and applies it only on failure.
#[derive(Debug)]
#[must_use = "dropping a revert discards the ability to roll back"]
pub struct StatusRevert {
    id: ApplicationId,
    previous: ApplicationStatus,
}

impl StatusRevert {
    /// Roll the optimistic flip back.
    pub fn apply(self, store: &ApplicationStore) {
        let _ = store.set_status(self.id, self.previous);
    }
}

impl ApplicationStore {
    /// Replace the whole list (refresh from the backend).
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn replace_all(&self, applications: Vec<SellerApplication>) {
        let mut guard = self.inner.write().expect("application store lock poisoned");
        *guard = applications;
    }

    /// Snapshot of the current list.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<SellerApplication> {
        self.inner
            .read()
            .expect("application store lock poisoned")
            .clone()
    }

    /// Look up one application.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn get(&self, id: ApplicationId) -> Option<SellerApplication> {
        self.inner
            .read()
            .expect("application store lock poisoned")
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Flip an application's status, returning the inverse command.
    ///
    /// Returns `None` when the application is not in the store.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn set_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Option<StatusRevert> {
        let mut guard = self.inner.write().expect("application store lock poisoned");
        let app = guard.iter_mut().find(|a| a.id == id)?;
        let previous = app.status;
        app.status = status;
        Some(StatusRevert { id, previous })
    }

    /// Record review metadata on a successfully persisted transition.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    fn finalize_review(&self, update: &ApplicationStatusUpdate) {
        let mut guard = self.inner.write().expect("application store lock poisoned");
        if let Some(app) = guard.iter_mut().find(|a| a.id == update.id) {
            app.reviewed_at = Some(update.reviewed_at);
            app.reviewer_id = update.reviewer_id;
            app.updated_at = update.reviewed_at;
        }
    }
}

/// Parse a reviewer reference, keeping it only when syntactically valid.
///
/// Deliberately a format test rather than an existence check; a malformed
/// reference is omitted from the write rather than sent as-is.
#[must_use]
pub fn parse_reviewer(reviewer: Option<&str>) -> Option<IdentityId> {
    reviewer.and_then(|raw| IdentityId::parse(raw).ok())
}

/// Compose the approval notification for an applicant.
#[must_use]
pub fn approval_message(first_name: &str, business_name: &str) -> SmsMessage {
    SmsMessage {
        body: format!(
            "Hi {first_name}, your seller application for {business_name} has been approved! \
             You can now start selling on CampusTrade."
        ),
        template: "seller_approved".to_string(),
        vars: vec![
            ("name".to_string(), first_name.to_string()),
            ("business".to_string(), business_name.to_string()),
        ],
    }
}

/// The approval/rejection engine.
pub struct ApplicationWorkflow<B, S> {
    backend: B,
    store: ApplicationStore,
    sms: Option<S>,
    /// Acting operator, for activity log attribution.
    operator_id: Option<IdentityId>,
    /// Kicked after each successful mutation so the dashboard catches up
    /// without waiting for the poll.
    stats_refresh: Option<RefreshHandle>,
}

impl<B: AdminBackend, S: SmsSender> ApplicationWorkflow<B, S> {
    /// Create a workflow engine.
    pub const fn new(
        backend: B,
        store: ApplicationStore,
        sms: Option<S>,
        operator_id: Option<IdentityId>,
    ) -> Self {
        Self {
            backend,
            store,
            sms,
            operator_id,
            stats_refresh: None,
        }
    }

    /// Attach the dashboard refresh handle.
    #[must_use]
    pub fn with_stats_refresh(mut self, handle: RefreshHandle) -> Self {
        self.stats_refresh = Some(handle);
        self
    }

    /// The in-memory application view this engine mutates.
    #[must_use]
    pub const fn store(&self) -> &ApplicationStore {
        &self.store
    }

    /// Reload the application list from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn reload(&self) -> Result<(), AppError> {
        let applications = self.backend.list_applications(None).await?;
        self.store.replace_all(applications);
        Ok(())
    }

    /// Approve a pending application.
    ///
    /// # Errors
    ///
    /// Returns an error if the application is unknown or not pending, or if
    /// any persistence step (status, role, profile) fails - in which case
    /// the optimistic status has already been reverted to `pending`.
    #[instrument(skip(self, reviewer), fields(application = %id))]
    pub async fn approve(&self, id: ApplicationId, reviewer: Option<&str>) -> Result<(), AppError> {
        let app = self
            .store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("application {id}")))?;
        if app.status != ApplicationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "application {id} is not pending (status: {})",
                app.status
            )));
        }

        // Step 1: optimistic flip; hold the inverse until steps 2-5 land.
        let revert = self
            .store
            .set_status(id, ApplicationStatus::Approved)
            .ok_or_else(|| AppError::NotFound(format!("application {id}")))?;

        let update = ApplicationStatusUpdate {
            id,
            status: ApplicationStatus::Approved,
            reviewed_at: Utc::now(),
            reviewer_id: parse_reviewer(reviewer),
        };

        let (applicant, profile) = match self.approve_persist(&app, &update).await {
            Ok(outcome) => outcome,
            Err(e) => {
                revert.apply(&self.store);
                error!(application = %id, error = %e, "Approval failed, optimistic status reverted");
                return Err(e);
            }
        };
        self.store.finalize_review(&update);
        info!(application = %id, applicant = %app.applicant_id, "Application approved");

        // Step 6: best-effort audit trail.
        record_best_effort(
            &self.backend,
            ActivityLogDraft::new(
                self.operator_id,
                ActionKind::ApplicationApproved,
                json!({
                    "application_id": id.as_i64(),
                    "applicant_id": app.applicant_id.to_string(),
                    "business_name": profile.business_name,
                    "new_role": applicant.role.with_seller_capability().as_str(),
                }),
            ),
        )
        .await;

        // Step 7: best-effort notification, only with a contact phone.
        self.notify_approval(&app, &applicant, &profile.business_name)
            .await;

        if let Some(refresh) = &self.stats_refresh {
            refresh.kick();
        }
        Ok(())
    }

    /// Steps 2-5: persist status, resolve and persist role, provision the
    /// profile. Any failure here triggers the optimistic revert.
    async fn approve_persist(
        &self,
        app: &SellerApplication,
        update: &ApplicationStatusUpdate,
    ) -> Result<(Identity, SellerProfileDraft), AppError> {
        self.backend.update_application_status(update).await?;

        let applicant = self.backend.fetch_identity(app.applicant_id).await?;
        let merged = applicant.role.with_seller_capability();
        self.backend
            .update_identity_role(app.applicant_id, merged)
            .await?;

        let profile = SellerProfileDraft::from_application(app);
        self.backend.upsert_seller_profile(&profile).await?;

        Ok((applicant, profile))
    }

    async fn notify_approval(&self, app: &SellerApplication, applicant: &Identity, business: &str) {
        let (Some(sms), Some(phone)) = (&self.sms, &app.contact_phone) else {
            return;
        };
        let message = approval_message(applicant.first_name(), business);
        if let Err(e) = sms.send(std::slice::from_ref(phone), &message).await {
            error!(application = %app.id, error = %e, "Failed to send approval notification");
        }
    }

    /// Reject a pending application.
    ///
    /// Same optimistic shape as approval, without the role, profile, and
    /// notification steps. The rejection-reason flow is a separate
    /// UI-confirmed concern and not handled here.
    ///
    /// # Errors
    ///
    /// Returns an error if the application is unknown or not pending, or if
    /// persisting the transition fails (the optimistic status is reverted).
    #[instrument(skip(self, reviewer), fields(application = %id))]
    pub async fn reject(&self, id: ApplicationId, reviewer: Option<&str>) -> Result<(), AppError> {
        let app = self
            .store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("application {id}")))?;
        if app.status != ApplicationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "application {id} is not pending (status: {})",
                app.status
            )));
        }

        let revert = self
            .store
            .set_status(id, ApplicationStatus::Rejected)
            .ok_or_else(|| AppError::NotFound(format!("application {id}")))?;

        let update = ApplicationStatusUpdate {
            id,
            status: ApplicationStatus::Rejected,
            reviewed_at: Utc::now(),
            reviewer_id: parse_reviewer(reviewer),
        };

        if let Err(e) = self.backend.update_application_status(&update).await {
            revert.apply(&self.store);
            error!(application = %id, error = %e, "Rejection failed, optimistic status reverted");
            return Err(e.into());
        }
        self.store.finalize_review(&update);
        info!(application = %id, "Application rejected");

        record_best_effort(
            &self.backend,
            ActivityLogDraft::new(
                self.operator_id,
                ActionKind::ApplicationRejected,
                json!({
                    "application_id": id.as_i64(),
                    "applicant_id": app.applicant_id.to_string(),
                    "business_name": app.business_name,
                }),
            ),
        )
        .await;

        if let Some(refresh) = &self.stats_refresh {
            refresh.kick();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn pending_app(id: i64) -> SellerApplication {
        SellerApplication {
            id: ApplicationId::new(id),
            applicant_id: IdentityId::new(Uuid::nil()),
            business_name: "Dorm Snacks".to_string(),
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

    #[test]
    fn set_status_returns_inverse_that_restores() {
        let store = ApplicationStore::default();
        store.replace_all(vec![pending_app(1)]);

        let revert = store
            .set_status(ApplicationId::new(1), ApplicationStatus::Approved)
            .expect("application exists");
        assert_eq!(
            store.get(ApplicationId::new(1)).map(|a| a.status),
            Some(ApplicationStatus::Approved)
        );

        revert.apply(&store);
        assert_eq!(
            store.get(ApplicationId::new(1)).map(|a| a.status),
            Some(ApplicationStatus::Pending)
        );
    }

    #[test]
    fn set_status_on_unknown_application_is_none() {
        let store = ApplicationStore::default();
        assert!(
            store
                .set_status(ApplicationId::new(9), ApplicationStatus::Approved)
                .is_none()
        );
    }

    #[test]
    fn reviewer_reference_is_a_syntactic_check() {
        assert!(parse_reviewer(None).is_none());
        assert!(parse_reviewer(Some("admin@campus")).is_none());
        assert!(parse_reviewer(Some("4f5c1b52-0b54-4a2e-9c63-2c6de8e1a001")).is_some());
    }

    #[test]
    fn approval_message_uses_first_name_and_business() {
        let message = approval_message("Wei", "Dorm Snacks");
        assert!(message.body.starts_with("Hi Wei,"));
        assert!(message.body.contains("Dorm Snacks"));
        assert_eq!(message.template, "seller_approved");
        assert!(
            message
                .vars
                .contains(&("business".to_string(), "Dorm Snacks".to_string()))
        );
    }
}
