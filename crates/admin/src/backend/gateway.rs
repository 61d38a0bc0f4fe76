//! Dual-path gateway contract.
//!
//! [`AdminBackend`] is the one contract every core operation is written
//! against. It has exactly two production implementations with matching
//! semantics per operation:
//!
//! - [`StandardPath`] - direct table operations under the caller's ambient
//!   identity and the backend's row-level policies
//! - [`BypassPath`] - named remote procedures carrying the shared secret
//!
//! [`DualPathBackend`] wraps both and picks one per call from the
//! credential store via the pure resolver - business logic never branches
//! on credentials itself. A denied call (either path) surfaces verbatim;
//! there is deliberately no fallback from bypass to standard, since the
//! standard path's policies may not grant the same privilege.

use std::future::Future;

use campus_trade_core::{ApplicationId, ApplicationStatus, IdentityId, Role};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::models::{ActivityLogDraft, Identity, PlatformSetting, SellerApplication, SellerProfileDraft};
use crate::session::{AccessPath, CredentialStore};

use super::client::{BackendClient, BackendError};
use super::filter::Filter;

/// Status transition persisted for a reviewed application.
#[derive(Debug, Clone)]
pub struct ApplicationStatusUpdate {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub reviewed_at: DateTime<Utc>,
    /// Omitted from the write entirely when `None` - never sent malformed.
    pub reviewer_id: Option<IdentityId>,
}

impl ApplicationStatusUpdate {
    fn patch(&self) -> JsonValue {
        let mut patch = json!({
            "status": self.status.as_str(),
            "reviewed_at": self.reviewed_at.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });
        if let (Some(reviewer), Some(map)) = (self.reviewer_id, patch.as_object_mut()) {
            map.insert("reviewer_id".to_string(), json!(reviewer.to_string()));
        }
        patch
    }
}

/// Contract shared by both calling conventions.
///
/// Every mutating operation of the core goes through one of these methods;
/// a single method call is atomic from the caller's point of view.
pub trait AdminBackend: Send + Sync {
    /// Fetch one identity.
    fn fetch_identity(
        &self,
        id: IdentityId,
    ) -> impl Future<Output = Result<Identity, BackendError>> + Send;

    /// Persist a new role onto an identity.
    fn update_identity_role(
        &self,
        id: IdentityId,
        role: Role,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// List applications, optionally restricted to one status.
    fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> impl Future<Output = Result<Vec<SellerApplication>, BackendError>> + Send;

    /// Persist an application status transition.
    fn update_application_status(
        &self,
        update: &ApplicationStatusUpdate,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Create-or-update a seller profile, keyed by applicant identity.
    fn upsert_seller_profile(
        &self,
        profile: &SellerProfileDraft,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Append an activity log entry.
    fn insert_activity_log(
        &self,
        entry: &ActivityLogDraft,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Write a platform settings flag.
    fn set_platform_setting(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Read all platform settings rows.
    fn list_platform_settings(
        &self,
    ) -> impl Future<Output = Result<Vec<PlatformSetting>, BackendError>> + Send;

    /// Count identities holding any of the given roles.
    fn count_identities_with_roles(
        &self,
        roles: &[Role],
    ) -> impl Future<Output = Result<u64, BackendError>> + Send;

    /// Count applications in one status.
    fn count_applications(
        &self,
        status: ApplicationStatus,
    ) -> impl Future<Output = Result<u64, BackendError>> + Send;

    /// Count products, optionally only active listings.
    fn count_products(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<u64, BackendError>> + Send;

    /// Signup timestamps within the trailing window, for growth bucketing.
    fn recent_signups(
        &self,
        days: u32,
    ) -> impl Future<Output = Result<Vec<DateTime<Utc>>, BackendError>> + Send;

    /// Declared departments of all identities (one entry per identity).
    fn list_departments(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CreatedAtRow {
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DepartmentRow {
    department: String,
}

/// Direct-table convention: ambient identity, row-level policies.
#[derive(Debug, Clone, Copy)]
pub struct StandardPath<'a> {
    client: &'a BackendClient,
}

impl<'a> StandardPath<'a> {
    /// Wrap a client for direct table operations.
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }
}

impl AdminBackend for StandardPath<'_> {
    async fn fetch_identity(&self, id: IdentityId) -> Result<Identity, BackendError> {
        let rows: Vec<Identity> = self
            .client
            .select("identities", &Filter::new().eq("id", id).limit(1))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("identity {id}")))
    }

    async fn update_identity_role(&self, id: IdentityId, role: Role) -> Result<(), BackendError> {
        self.client
            .update(
                "identities",
                &Filter::new().eq("id", id),
                &json!({ "role": role.as_str() }),
            )
            .await
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<SellerApplication>, BackendError> {
        let mut filter = Filter::new().order_desc("created_at");
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        self.client.select("seller_applications", &filter).await
    }

    async fn update_application_status(
        &self,
        update: &ApplicationStatusUpdate,
    ) -> Result<(), BackendError> {
        self.client
            .update(
                "seller_applications",
                &Filter::new().eq("id", update.id),
                &update.patch(),
            )
            .await
    }

    async fn upsert_seller_profile(
        &self,
        profile: &SellerProfileDraft,
    ) -> Result<(), BackendError> {
        self.client
            .upsert("seller_profiles", "identity_id", profile)
            .await
    }

    async fn insert_activity_log(&self, entry: &ActivityLogDraft) -> Result<(), BackendError> {
        self.client.insert("activity_logs", entry).await
    }

    async fn set_platform_setting(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> Result<(), BackendError> {
        self.client
            .upsert(
                "platform_settings",
                "key",
                &json!({ "key": key, "value": value }),
            )
            .await
    }

    async fn list_platform_settings(&self) -> Result<Vec<PlatformSetting>, BackendError> {
        self.client.select("platform_settings", &Filter::new()).await
    }

    async fn count_identities_with_roles(&self, roles: &[Role]) -> Result<u64, BackendError> {
        let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        self.client
            .count("identities", &Filter::new().in_set("role", &names))
            .await
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64, BackendError> {
        self.client
            .count(
                "seller_applications",
                &Filter::new().eq("status", status.as_str()),
            )
            .await
    }

    async fn count_products(&self, active_only: bool) -> Result<u64, BackendError> {
        let mut filter = Filter::new();
        if active_only {
            filter = filter.eq("active", "true");
        }
        self.client.count("products", &filter).await
    }

    async fn recent_signups(&self, days: u32) -> Result<Vec<DateTime<Utc>>, BackendError> {
        let since = Utc::now() - Duration::days(i64::from(days));
        let rows: Vec<CreatedAtRow> = self
            .client
            .select(
                "identities",
                &Filter::new().gte("created_at", since.to_rfc3339()),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.created_at).collect())
    }

    async fn list_departments(&self) -> Result<Vec<String>, BackendError> {
        let rows: Vec<DepartmentRow> = self
            .client
            .select("identities", &Filter::new().not_null("department"))
            .await?;
        Ok(rows.into_iter().map(|r| r.department).collect())
    }
}

/// Remote-procedure convention: explicit shared secret per call.
pub struct BypassPath<'a> {
    client: &'a BackendClient,
    secret: SecretString,
}

impl<'a> BypassPath<'a> {
    /// Wrap a client with the shared secret for procedure payloads.
    #[must_use]
    pub const fn new(client: &'a BackendClient, secret: SecretString) -> Self {
        Self { client, secret }
    }

    fn with_secret(&self, mut payload: JsonValue) -> JsonValue {
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "secret".to_string(),
                json!(self.secret.expose_secret()),
            );
        }
        payload
    }

    async fn call_unit(&self, name: &str, payload: JsonValue) -> Result<(), BackendError> {
        let _: JsonValue = self.client.rpc(name, &self.with_secret(payload)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for BypassPath<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BypassPath")
            .field("secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AdminBackend for BypassPath<'_> {
    async fn fetch_identity(&self, id: IdentityId) -> Result<Identity, BackendError> {
        let rows: Vec<Identity> = self
            .client
            .rpc(
                "admin_get_identity",
                &self.with_secret(json!({ "identity_id": id.to_string() })),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("identity {id}")))
    }

    async fn update_identity_role(&self, id: IdentityId, role: Role) -> Result<(), BackendError> {
        self.call_unit(
            "admin_update_identity_role",
            json!({ "identity_id": id.to_string(), "role": role.as_str() }),
        )
        .await
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<SellerApplication>, BackendError> {
        self.client
            .rpc(
                "admin_list_applications",
                &self.with_secret(json!({
                    "status": status.map(ApplicationStatus::as_str),
                })),
            )
            .await
    }

    async fn update_application_status(
        &self,
        update: &ApplicationStatusUpdate,
    ) -> Result<(), BackendError> {
        self.call_unit(
            "admin_update_application_status",
            json!({
                "application_id": update.id.as_i64(),
                "patch": update.patch(),
            }),
        )
        .await
    }

    async fn upsert_seller_profile(
        &self,
        profile: &SellerProfileDraft,
    ) -> Result<(), BackendError> {
        self.call_unit(
            "admin_upsert_seller_profile",
            json!({ "profile": profile }),
        )
        .await
    }

    async fn insert_activity_log(&self, entry: &ActivityLogDraft) -> Result<(), BackendError> {
        self.call_unit("admin_insert_activity_log", json!({ "entry": entry }))
            .await
    }

    async fn set_platform_setting(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> Result<(), BackendError> {
        self.call_unit(
            "admin_set_platform_setting",
            json!({ "key": key, "value": value }),
        )
        .await
    }

    async fn list_platform_settings(&self) -> Result<Vec<PlatformSetting>, BackendError> {
        self.client
            .rpc("admin_list_platform_settings", &self.with_secret(json!({})))
            .await
    }

    async fn count_identities_with_roles(&self, roles: &[Role]) -> Result<u64, BackendError> {
        let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        self.client
            .rpc(
                "admin_count_identities",
                &self.with_secret(json!({ "roles": names })),
            )
            .await
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64, BackendError> {
        self.client
            .rpc(
                "admin_count_applications",
                &self.with_secret(json!({ "status": status.as_str() })),
            )
            .await
    }

    async fn count_products(&self, active_only: bool) -> Result<u64, BackendError> {
        self.client
            .rpc(
                "admin_count_products",
                &self.with_secret(json!({ "active_only": active_only })),
            )
            .await
    }

    async fn recent_signups(&self, days: u32) -> Result<Vec<DateTime<Utc>>, BackendError> {
        self.client
            .rpc(
                "admin_recent_signups",
                &self.with_secret(json!({ "days": days })),
            )
            .await
    }

    async fn list_departments(&self) -> Result<Vec<String>, BackendError> {
        self.client
            .rpc("admin_list_departments", &self.with_secret(json!({})))
            .await
    }
}

/// Production backend: resolves the calling convention once per call.
#[derive(Debug, Clone)]
pub struct DualPathBackend {
    client: BackendClient,
    credentials: CredentialStore,
}

impl DualPathBackend {
    /// Create a dual-path backend over a client and credential store.
    #[must_use]
    pub const fn new(client: BackendClient, credentials: CredentialStore) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

/// Dispatch one call to the path the resolver picked.
macro_rules! via_path {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self.credentials.resolve() {
            AccessPath::Standard => {
                StandardPath::new(&$self.client).$method($($arg),*).await
            }
            AccessPath::Bypass { secret } => {
                BypassPath::new(&$self.client, secret).$method($($arg),*).await
            }
        }
    };
}

impl AdminBackend for DualPathBackend {
    async fn fetch_identity(&self, id: IdentityId) -> Result<Identity, BackendError> {
        via_path!(self, fetch_identity(id))
    }

    async fn update_identity_role(&self, id: IdentityId, role: Role) -> Result<(), BackendError> {
        via_path!(self, update_identity_role(id, role))
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<SellerApplication>, BackendError> {
        via_path!(self, list_applications(status))
    }

    async fn update_application_status(
        &self,
        update: &ApplicationStatusUpdate,
    ) -> Result<(), BackendError> {
        via_path!(self, update_application_status(update))
    }

    async fn upsert_seller_profile(
        &self,
        profile: &SellerProfileDraft,
    ) -> Result<(), BackendError> {
        via_path!(self, upsert_seller_profile(profile))
    }

    async fn insert_activity_log(&self, entry: &ActivityLogDraft) -> Result<(), BackendError> {
        via_path!(self, insert_activity_log(entry))
    }

    async fn set_platform_setting(
        &self,
        key: &str,
        value: &JsonValue,
    ) -> Result<(), BackendError> {
        via_path!(self, set_platform_setting(key, value))
    }

    async fn list_platform_settings(&self) -> Result<Vec<PlatformSetting>, BackendError> {
        via_path!(self, list_platform_settings())
    }

    async fn count_identities_with_roles(&self, roles: &[Role]) -> Result<u64, BackendError> {
        via_path!(self, count_identities_with_roles(roles))
    }

    async fn count_applications(&self, status: ApplicationStatus) -> Result<u64, BackendError> {
        via_path!(self, count_applications(status))
    }

    async fn count_products(&self, active_only: bool) -> Result<u64, BackendError> {
        via_path!(self, count_products(active_only))
    }

    async fn recent_signups(&self, days: u32) -> Result<Vec<DateTime<Utc>>, BackendError> {
        via_path!(self, recent_signups(days))
    }

    async fn list_departments(&self) -> Result<Vec<String>, BackendError> {
        via_path!(self, list_departments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_patch_omits_invalid_reviewer() {
        let update = ApplicationStatusUpdate {
            id: ApplicationId::new(7),
            status: ApplicationStatus::Approved,
            reviewed_at: Utc::now(),
            reviewer_id: None,
        };
        let patch = update.patch();
        assert_eq!(patch["status"], "approved");
        assert!(patch.get("reviewer_id").is_none());
    }

    #[test]
    fn status_patch_includes_valid_reviewer() {
        let reviewer = IdentityId::parse("4f5c1b52-0b54-4a2e-9c63-2c6de8e1a001").expect("uuid");
        let update = ApplicationStatusUpdate {
            id: ApplicationId::new(7),
            status: ApplicationStatus::Rejected,
            reviewed_at: Utc::now(),
            reviewer_id: Some(reviewer),
        };
        let patch = update.patch();
        assert_eq!(patch["reviewer_id"], reviewer.to_string());
    }
}
