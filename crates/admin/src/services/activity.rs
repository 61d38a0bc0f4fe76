//! Best-effort activity log writer.
//!
//! The activity log is an audit trail, not a dependency: a failed append is
//! reported on the diagnostic channel and otherwise ignored. It is never
//! retried, and it never fails or reverts the workflow that produced it.

use tracing::error;

use crate::backend::AdminBackend;
use crate::models::ActivityLogDraft;

/// Append an entry, swallowing any failure.
pub async fn record_best_effort<B: AdminBackend>(backend: &B, entry: ActivityLogDraft) {
    let action = entry.action.as_str();
    if let Err(e) = backend.insert_activity_log(&entry).await {
        error!(action = %action, error = %e, "Failed to append activity log entry");
    }
}
