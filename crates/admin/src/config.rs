//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the hosted data backend
//! - `BACKEND_API_KEY` - Project API key sent with every backend request
//!
//! ## Optional
//! - `BACKEND_ACCESS_TOKEN` - Operator's own bearer token (ambient identity
//!   for the standard path; without it only the bypass path can mutate)
//! - `ADMIN_BYPASS_ENABLED` - "true" enables the system bypass path
//! - `ADMIN_BYPASS_SECRET` - Shared secret for the bypass path
//! - `ADMIN_BYPASS_TOKEN` - Server-issued bypass session token
//! - `ADMIN_OPERATOR_ID` - Operator's identity UUID (reviewer attribution,
//!   presence self-suppression)
//! - `SMS_API_URL` - SMS provider endpoint (unset disables SMS)
//! - `SMS_API_KEY` - SMS provider API key
//! - `SMS_SENDER_TAG` - Registered sender signature for outbound SMS
//! - `STATS_POLL_SECS` - Dashboard refresh poll period (default: 30)

use campus_trade_core::IdentityId;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Default dashboard poll period in seconds.
const DEFAULT_STATS_POLL_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Incomplete bypass credentials: {0}")]
    IncompleteBypass(String),
}

/// Admin console configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Hosted data backend connection.
    pub backend: BackendConfig,
    /// Bypass credentials (optional - absent means standard path only).
    pub bypass: Option<BypassConfig>,
    /// SMS provider (optional - absent disables outbound notifications).
    pub sms: Option<SmsConfig>,
    /// Operator's own identity, when known.
    pub operator_id: Option<IdentityId>,
    /// Dashboard refresh poll period in seconds.
    pub stats_poll_secs: u64,
}

/// Hosted backend connection configuration.
///
/// Implements `Debug` manually to redact the keys.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the backend project.
    pub url: Url,
    /// Project API key (sent as `apikey` on every request).
    pub api_key: SecretString,
    /// Operator's bearer token for the standard identity path.
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// System bypass credentials.
///
/// The three local values whose presence switches mutating calls onto the
/// secret-authenticated remote-procedure convention.
#[derive(Clone)]
pub struct BypassConfig {
    /// Whether the bypass path is enabled at all.
    pub enabled: bool,
    /// Shared secret passed explicitly in remote-procedure payloads.
    pub secret: SecretString,
    /// Server-issued session token, revalidated by the heartbeat.
    pub token: String,
}

impl std::fmt::Debug for BypassConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BypassConfig")
            .field("enabled", &self.enabled)
            .field("secret", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// SMS provider configuration.
#[derive(Clone)]
pub struct SmsConfig {
    /// Provider API endpoint.
    pub api_url: Url,
    /// Provider API key.
    pub api_key: SecretString,
    /// Registered sender signature prefixed to outbound messages.
    pub sender_tag: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("sender_tag", &self.sender_tag)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the bypass variables are only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        let bypass = BypassConfig::from_env()?;
        let sms = SmsConfig::from_env()?;

        let operator_id = match get_optional_env("ADMIN_OPERATOR_ID") {
            Some(raw) => Some(IdentityId::parse(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("ADMIN_OPERATOR_ID".to_string(), e.to_string())
            })?),
            None => None,
        };

        let stats_poll_secs = match get_optional_env("STATS_POLL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("STATS_POLL_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_STATS_POLL_SECS,
        };

        Ok(Self {
            backend,
            bypass,
            sms,
            operator_id,
            stats_poll_secs,
        })
    }

    /// Returns a reference to the SMS configuration, if available.
    ///
    /// Returns `None` if the SMS variables are not set, which disables
    /// outbound notifications (they are best-effort anyway).
    #[must_use]
    pub const fn sms(&self) -> Option<&SmsConfig> {
        self.sms.as_ref()
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = get_required_env("BACKEND_URL")?
            .parse::<Url>()
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            api_key: get_required_secret("BACKEND_API_KEY")?,
            access_token: get_optional_env("BACKEND_ACCESS_TOKEN").map(SecretString::from),
        })
    }
}

impl BypassConfig {
    /// Load the bypass triple from the environment.
    ///
    /// All three variables must be present together; a partial set is a
    /// configuration error rather than a silently-disabled bypass.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let enabled = get_optional_env("ADMIN_BYPASS_ENABLED");
        let secret = get_optional_env("ADMIN_BYPASS_SECRET");
        let token = get_optional_env("ADMIN_BYPASS_TOKEN");

        match (enabled, secret, token) {
            (Some(enabled), Some(secret), Some(token)) => {
                let enabled = enabled.parse::<bool>().map_err(|e| {
                    ConfigError::InvalidEnvVar("ADMIN_BYPASS_ENABLED".to_string(), e.to_string())
                })?;
                Ok(Some(Self {
                    enabled,
                    secret: SecretString::from(secret),
                    token,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteBypass(
                "ADMIN_BYPASS_ENABLED, ADMIN_BYPASS_SECRET, and ADMIN_BYPASS_TOKEN must be set together"
                    .to_string(),
            )),
        }
    }

    /// Whether this bypass triple is usable as a calling convention.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.secret.expose_secret().is_empty()
    }
}

impl SmsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_url) = get_optional_env("SMS_API_URL") else {
            return Ok(None);
        };
        let api_url = api_url
            .parse::<Url>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMS_API_URL".to_string(), e.to_string()))?;

        Ok(Some(Self {
            api_url,
            api_key: get_required_secret("SMS_API_KEY")?,
            sender_tag: get_required_env("SMS_SENDER_TAG")?,
        }))
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backend_config_debug_redacts_keys() {
        let config = BackendConfig {
            url: "https://backend.example.com".parse().unwrap(),
            api_key: SecretString::from("project-key"),
            access_token: Some(SecretString::from("bearer-token")),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("project-key"));
        assert!(!debug.contains("bearer-token"));
    }

    #[test]
    fn bypass_config_debug_redacts_secret_and_token() {
        let config = BypassConfig {
            enabled: true,
            secret: SecretString::from("shared-secret"),
            token: "session-token".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("enabled: true"));
        assert!(!debug.contains("shared-secret"));
        assert!(!debug.contains("session-token"));
    }

    #[test]
    fn bypass_usable_requires_flag_and_nonempty_secret() {
        let usable = BypassConfig {
            enabled: true,
            secret: SecretString::from("s"),
            token: "t".to_string(),
        };
        assert!(usable.is_usable());

        let disabled = BypassConfig {
            enabled: false,
            secret: SecretString::from("s"),
            token: "t".to_string(),
        };
        assert!(!disabled.is_usable());

        let empty_secret = BypassConfig {
            enabled: true,
            secret: SecretString::from(""),
            token: "t".to_string(),
        };
        assert!(!empty_secret.is_usable());
    }
}
