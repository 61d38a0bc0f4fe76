//! Bypass session lifecycle.
//!
//! The three local credential values (bypass flag, shared secret, session
//! token) live in an explicit [`CredentialStore`] created at login and torn
//! down at logout or revocation - never in ambient global storage. The
//! resolver is a pure decision over the store's current contents, made
//! independently for every call; nothing here retries or falls back when
//! the chosen path is denied.

pub mod heartbeat;

use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};

use crate::config::BypassConfig;

pub use heartbeat::{HeartbeatMonitor, SessionCheck, SessionProbe, SessionState};

/// Calling convention chosen for one backend call.
#[derive(Clone)]
pub enum AccessPath {
    /// Direct table operations under the caller's own ambient identity and
    /// the backend's row-level policies.
    Standard,
    /// Remote procedures carrying the shared secret explicitly.
    Bypass {
        /// Secret to embed in the procedure payload.
        secret: SecretString,
    },
}

impl std::fmt::Debug for AccessPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => f.write_str("Standard"),
            Self::Bypass { .. } => f.write_str("Bypass { secret: [REDACTED] }"),
        }
    }
}

/// Decide which calling convention a call should use.
///
/// Pure: bypass requires the flag set and a non-empty secret; anything else
/// is the standard path. The token is deliberately not consulted here - its
/// validity is the heartbeat's concern, and the backend rejects a stale
/// secret on its own.
#[must_use]
pub fn resolve_path(credentials: Option<&BypassConfig>) -> AccessPath {
    match credentials {
        Some(creds) if creds.is_usable() => AccessPath::Bypass {
            secret: creds.secret.clone(),
        },
        _ => AccessPath::Standard,
    }
}

/// Shared holder for the bypass credential triple.
///
/// Cloning shares the same underlying slot; [`CredentialStore::clear`] on
/// any clone de-authenticates them all.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<BypassConfig>>>,
}

impl CredentialStore {
    /// Create a store holding the given credentials (or none).
    #[must_use]
    pub fn new(credentials: Option<BypassConfig>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Resolve the calling convention for one call.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned (a panic while holding it).
    #[must_use]
    pub fn resolve(&self) -> AccessPath {
        let guard = self.inner.read().expect("credential store lock poisoned");
        resolve_path(guard.as_ref())
    }

    /// The `{secret, token}` pair the heartbeat revalidates, when the full
    /// triple is present.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn heartbeat_target(&self) -> Option<(SecretString, String)> {
        let guard = self.inner.read().expect("credential store lock poisoned");
        let creds = guard.as_ref()?;
        if creds.is_usable() && !creds.token.is_empty() {
            Some((creds.secret.clone(), creds.token.clone()))
        } else {
            None
        }
    }

    /// Whether any bypass credentials are currently held.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.inner
            .read()
            .expect("credential store lock poisoned")
            .is_some()
    }

    /// Tear down the stored secret, token, and flag.
    ///
    /// Called at logout and, synchronously, when the heartbeat detects
    /// revocation. Subsequent calls resolve to the standard path.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn clear(&self) {
        let mut guard = self.inner.write().expect("credential store lock poisoned");
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(enabled: bool, secret: &str, token: &str) -> BypassConfig {
        BypassConfig {
            enabled,
            secret: SecretString::from(secret),
            token: token.to_string(),
        }
    }

    #[test]
    fn resolves_bypass_only_with_flag_and_secret() {
        assert!(matches!(resolve_path(None), AccessPath::Standard));
        assert!(matches!(
            resolve_path(Some(&creds(false, "s", "t"))),
            AccessPath::Standard
        ));
        assert!(matches!(
            resolve_path(Some(&creds(true, "", "t"))),
            AccessPath::Standard
        ));
        assert!(matches!(
            resolve_path(Some(&creds(true, "s", "t"))),
            AccessPath::Bypass { .. }
        ));
    }

    #[test]
    fn resolver_ignores_missing_token() {
        // Token validity is the heartbeat's concern, not the resolver's.
        assert!(matches!(
            resolve_path(Some(&creds(true, "s", ""))),
            AccessPath::Bypass { .. }
        ));
    }

    #[test]
    fn clear_tears_down_all_three_values() {
        let store = CredentialStore::new(Some(creds(true, "s", "t")));
        assert!(store.is_held());
        assert!(store.heartbeat_target().is_some());

        store.clear();
        assert!(!store.is_held());
        assert!(store.heartbeat_target().is_none());
        assert!(matches!(store.resolve(), AccessPath::Standard));
    }

    #[test]
    fn clear_propagates_to_clones() {
        let store = CredentialStore::new(Some(creds(true, "s", "t")));
        let clone = store.clone();
        clone.clear();
        assert!(!store.is_held());
    }

    #[test]
    fn heartbeat_target_requires_full_triple() {
        let store = CredentialStore::new(Some(creds(true, "s", "")));
        assert!(store.heartbeat_target().is_none());

        let store = CredentialStore::new(Some(creds(true, "s", "t")));
        let (secret, token) = store.heartbeat_target().expect("full triple");
        assert_eq!(secret.expose_secret(), "s");
        assert_eq!(token, "t");
    }
}
