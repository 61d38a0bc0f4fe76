//! Platform settings writes.
//!
//! A settings flag write is a mutating admin action like any other: it
//! rides the resolved calling convention, leaves a best-effort audit entry,
//! and kicks a silent dashboard refresh so the flags card catches up.

use campus_trade_core::IdentityId;
use serde_json::{Value as JsonValue, json};
use tracing::{info, instrument};

use crate::backend::AdminBackend;
use crate::error::AppError;
use crate::models::{ActionKind, ActivityLogDraft};

use super::activity::record_best_effort;
use super::stats::RefreshHandle;

/// Persist one settings flag, audit it, and refresh the dashboard.
///
/// # Errors
///
/// Returns an error if persisting the setting fails; the audit entry and
/// refresh are skipped in that case.
#[instrument(skip(backend, refresh, value))]
pub async fn apply_setting<B: AdminBackend>(
    backend: &B,
    actor: Option<IdentityId>,
    refresh: &RefreshHandle,
    key: &str,
    value: JsonValue,
) -> Result<(), AppError> {
    backend.set_platform_setting(key, &value).await?;
    info!(key, "Platform setting updated");
    record_best_effort(
        backend,
        ActivityLogDraft::new(
            actor,
            ActionKind::SettingChanged,
            json!({ "key": key, "value": value }),
        ),
    )
    .await;
    refresh.kick();
    Ok(())
}
