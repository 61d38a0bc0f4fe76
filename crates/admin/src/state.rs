//! Application state shared across console tasks.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::backend::DualPathBackend;
use crate::config::AdminConfig;
use crate::error::AppError;
use crate::services::settings::apply_setting;
use crate::services::stats::RefreshHandle;
use crate::services::workflow::ApplicationStore;
use crate::session::CredentialStore;

/// Shared console state. Cloning is cheap; everything lives behind one
/// `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: AdminConfig,
    backend: DualPathBackend,
    credentials: CredentialStore,
    applications: ApplicationStore,
    stats_refresh: RefreshHandle,
}

impl AppState {
    /// Assemble the shared state.
    pub fn new(
        config: AdminConfig,
        backend: DualPathBackend,
        credentials: CredentialStore,
        applications: ApplicationStore,
        stats_refresh: RefreshHandle,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                credentials,
                applications,
                stats_refresh,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &DualPathBackend {
        &self.inner.backend
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    #[must_use]
    pub fn applications(&self) -> &ApplicationStore {
        &self.inner.applications
    }

    #[must_use]
    pub fn stats_refresh(&self) -> &RefreshHandle {
        &self.inner.stats_refresh
    }

    /// Write a platform settings flag (audited, with a silent dashboard
    /// refresh).
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the setting fails.
    pub async fn set_setting(&self, key: &str, value: JsonValue) -> Result<(), AppError> {
        apply_setting(
            &self.inner.backend,
            self.inner.config.operator_id,
            &self.inner.stats_refresh,
            key,
            value,
        )
        .await
    }
}
