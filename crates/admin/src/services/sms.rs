//! SMS provider client.
//!
//! Outbound notifications are strictly best-effort: callers catch and log
//! every failure, never propagate it, and never retry automatically. The
//! provider also exposes the account balance shown on the dashboard.

use std::future::Future;

use campus_trade_core::Phone;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::SmsConfig;

/// Errors from the SMS provider.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// Failed to send the request.
    #[error("sms request failed: {0}")]
    Request(String),

    /// Failed to decode the response.
    #[error("sms response invalid: {0}")]
    Response(String),

    /// Provider rejected the request.
    #[error("sms provider error: {0}")]
    Api(String),
}

/// A composed outbound message.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    /// Rendered message body.
    pub body: String,
    /// Provider template tag.
    pub template: String,
    /// Substitution variables the provider logs alongside the template.
    pub vars: Vec<(String, String)>,
}

/// Outbound SMS delivery, abstracted so the workflow can be tested without
/// a provider.
pub trait SmsSender: Send + Sync {
    /// Deliver one message to the given numbers.
    fn send(
        &self,
        to: &[Phone],
        message: &SmsMessage,
    ) -> impl Future<Output = Result<(), SmsError>> + Send;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: Vec<&'a str>,
    body: &'a str,
    template: &'a str,
    vars: Vec<(&'a str, &'a str)>,
    sender: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    ok: bool,
    error: Option<String>,
    balance: Option<i64>,
}

/// SMS provider API client.
#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    api_url: Url,
    api_key: SecretString,
    sender_tag: String,
}

impl std::fmt::Debug for SmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsClient")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("sender_tag", &self.sender_tag)
            .finish_non_exhaustive()
    }
}

impl SmsClient {
    /// Create a new SMS client from configuration.
    #[must_use]
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender_tag: config.sender_tag.clone(),
        }
    }

    fn endpoint(&self, segment: &str) -> Result<Url, SmsError> {
        self.api_url
            .join(segment)
            .map_err(|e| SmsError::Request(e.to_string()))
    }

    async fn post(&self, segment: &str, payload: &impl Serialize) -> Result<ProviderResponse, SmsError> {
        let response = self
            .client
            .post(self.endpoint(segment)?)
            .bearer_auth(self.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let result: ProviderResponse = response
            .json()
            .await
            .map_err(|e| SmsError::Response(e.to_string()))?;

        if result.ok {
            Ok(result)
        } else {
            Err(SmsError::Api(
                result.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    /// Query the remaining account balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    #[instrument(skip(self))]
    pub async fn balance(&self) -> Result<i64, SmsError> {
        let result = self.post("balance", &serde_json::json!({})).await?;
        result
            .balance
            .ok_or_else(|| SmsError::Response("balance missing from response".to_string()))
    }
}

impl SmsSender for SmsClient {
    #[instrument(skip(self, message), fields(template = %message.template, recipients = to.len()))]
    async fn send(&self, to: &[Phone], message: &SmsMessage) -> Result<(), SmsError> {
        let request = SendRequest {
            to: to.iter().map(Phone::as_str).collect(),
            body: &message.body,
            template: &message.template,
            vars: message
                .vars
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            sender: &self.sender_tag,
        };
        self.post("send", &request).await?;
        debug!("sms dispatched");
        Ok(())
    }
}
