//! Bypass session heartbeat monitor.
//!
//! While bypass credentials are held, the backend's session-check procedure
//! is called once immediately and then on a fixed period. The backend keeps
//! at most one bypass session valid at a time, so a newer login elsewhere
//! supersedes this one; the first not-ok answer (or transport failure) is
//! fatal: credentials are cleared synchronously and the revocation reason is
//! published for the host UI to force re-authentication. Revoked is terminal
//! for the process lifetime - a fresh monitor requires a new login.
//!
//! There is no timeout on the check itself; a hung backend call only delays
//! detection.

use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::backend::{BackendClient, BackendError};

use super::CredentialStore;

/// Period between heartbeat checks.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Result of one session check.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCheck {
    /// Whether the session is still the sole authoritative one.
    pub ok: bool,
    /// Human-readable reason when not ok ("session superseded",
    /// "session expired").
    pub reason: Option<String>,
}

/// Monitor lifecycle state, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No bypass session is held.
    Idle,
    /// Periodic revalidation is running.
    Monitoring,
    /// The session was revoked; credentials have been cleared.
    Revoked {
        /// Reason surfaced to the operator.
        reason: String,
    },
}

/// Backend session-check call, abstracted so tests can stub the backend.
pub trait SessionProbe: Send + Sync {
    /// Revalidate `{secret, token}` against the backend.
    fn check_session(
        &self,
        secret: &SecretString,
        token: &str,
    ) -> impl Future<Output = Result<SessionCheck, BackendError>> + Send;
}

impl SessionProbe for BackendClient {
    async fn check_session(
        &self,
        secret: &SecretString,
        token: &str,
    ) -> Result<SessionCheck, BackendError> {
        self.rpc(
            "admin_session_check",
            &json!({
                "secret": secret.expose_secret(),
                "token": token,
            }),
        )
        .await
    }
}

/// Periodic revalidator for a bypass session.
pub struct HeartbeatMonitor<P> {
    probe: P,
    credentials: CredentialStore,
    period: Duration,
    state_tx: watch::Sender<SessionState>,
}

impl<P: SessionProbe + 'static> HeartbeatMonitor<P> {
    /// Create a monitor with the default period.
    #[must_use]
    pub fn new(probe: P, credentials: CredentialStore) -> (Self, watch::Receiver<SessionState>) {
        Self::with_period(probe, credentials, HEARTBEAT_PERIOD)
    }

    /// Create a monitor with a custom period (tests).
    #[must_use]
    pub fn with_period(
        probe: P,
        credentials: CredentialStore,
        period: Duration,
    ) -> (Self, watch::Receiver<SessionState>) {
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        (
            Self {
                probe,
                credentials,
                period,
                state_tx,
            },
            state_rx,
        )
    }

    /// Spawn the monitor loop.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the monitor to completion (Idle with nothing to monitor, or
    /// Revoked).
    #[instrument(skip(self))]
    pub async fn run(self) {
        let Some((secret, token)) = self.credentials.heartbeat_target() else {
            // Flag, secret, and token were not all present; stay Idle.
            return;
        };

        let _ = self.state_tx.send(SessionState::Monitoring);
        info!("bypass session heartbeat started");

        let mut interval = tokio::time::interval(self.period);
        // First tick fires immediately: validate at Monitoring-entry rather
        // than waiting a full period.
        loop {
            interval.tick().await;
            match self.probe.check_session(&secret, &token).await {
                Ok(SessionCheck { ok: true, .. }) => {}
                Ok(SessionCheck { ok: false, reason }) => {
                    let reason =
                        reason.unwrap_or_else(|| "session no longer valid".to_string());
                    self.revoke(reason);
                    return;
                }
                Err(e) => {
                    self.revoke(format!("session check failed: {e}"));
                    return;
                }
            }
        }
    }

    /// Clear credentials and publish the terminal Revoked state.
    fn revoke(&self, reason: String) {
        warn!(reason = %reason, "bypass session revoked");
        self.credentials.clear();
        if self
            .state_tx
            .send(SessionState::Revoked { reason })
            .is_err()
        {
            error!("no listener for session revocation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::BypassConfig;

    struct ScriptedProbe {
        responses: Mutex<Vec<Result<SessionCheck, BackendError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(responses: Vec<Result<SessionCheck, BackendError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SessionProbe for ScriptedProbe {
        async fn check_session(
            &self,
            _secret: &SecretString,
            _token: &str,
        ) -> Result<SessionCheck, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().expect("lock");
            if responses.is_empty() {
                Ok(SessionCheck {
                    ok: false,
                    reason: Some("script exhausted".to_string()),
                })
            } else {
                responses.remove(0)
            }
        }
    }

    fn store_with_creds() -> CredentialStore {
        CredentialStore::new(Some(BypassConfig {
            enabled: true,
            secret: SecretString::from("shared-secret"),
            token: "session-token".to_string(),
        }))
    }

    #[tokio::test]
    async fn stays_idle_without_credentials() {
        let probe = ScriptedProbe::new(vec![]);
        let (monitor, state_rx) =
            HeartbeatMonitor::with_period(probe, CredentialStore::default(), Duration::from_millis(5));
        monitor.run().await;
        assert_eq!(*state_rx.borrow(), SessionState::Idle);
    }

    #[tokio::test]
    async fn superseded_session_clears_credentials_and_revokes() {
        let probe = ScriptedProbe::new(vec![
            Ok(SessionCheck {
                ok: true,
                reason: None,
            }),
            Ok(SessionCheck {
                ok: false,
                reason: Some("session superseded".to_string()),
            }),
        ]);
        let store = store_with_creds();
        let (monitor, state_rx) =
            HeartbeatMonitor::with_period(probe, store.clone(), Duration::from_millis(5));
        monitor.run().await;

        assert!(!store.is_held(), "credentials must be torn down");
        assert_eq!(
            *state_rx.borrow(),
            SessionState::Revoked {
                reason: "session superseded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn transport_error_is_fatal() {
        let probe = ScriptedProbe::new(vec![Err(BackendError::Request(
            "connection refused".to_string(),
        ))]);
        let store = store_with_creds();
        let (monitor, state_rx) =
            HeartbeatMonitor::with_period(probe, store.clone(), Duration::from_millis(5));
        monitor.run().await;

        assert!(!store.is_held());
        assert!(matches!(
            &*state_rx.borrow(),
            SessionState::Revoked { reason } if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn first_check_runs_immediately() {
        // A long period with a first-response revocation: run() must still
        // return promptly because the first tick is immediate.
        let probe = ScriptedProbe::new(vec![Ok(SessionCheck {
            ok: false,
            reason: Some("session expired".to_string()),
        })]);
        let store = store_with_creds();
        let (monitor, state_rx) =
            HeartbeatMonitor::with_period(probe, store, Duration::from_secs(3600));

        tokio::time::timeout(Duration::from_secs(1), monitor.run())
            .await
            .expect("first check must not wait a full period");
        assert!(matches!(
            &*state_rx.borrow(),
            SessionState::Revoked { reason } if reason == "session expired"
        ));
    }
}
