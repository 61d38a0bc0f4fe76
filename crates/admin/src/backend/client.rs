//! HTTP transport for the hosted data backend.
//!
//! Speaks the backend's REST dialect: table operations under `rest/v1/` and
//! named procedures under `rest/v1/rpc/`. Carries the project API key on
//! every request and the operator's own bearer token when one is held (the
//! ambient identity the backend's row-level policies evaluate).

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BackendConfig;

use super::filter::Filter;

/// Errors from backend calls.
///
/// Authorization failures (a rejected bypass secret or a row-level policy
/// denial) surface as [`BackendError::Api`] with the backend's own message,
/// verbatim. Callers never retry or fall back to the other path.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Failed to send the request (network, DNS, TLS).
    #[error("backend request failed: {0}")]
    Request(String),

    /// Failed to decode the response body.
    #[error("backend response invalid: {0}")]
    Response(String),

    /// Backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend's error message, verbatim.
        message: String,
    },

    /// A row the operation requires does not exist (or policy hides it).
    #[error("not found: {0}")]
    NotFound(String),
}

impl BackendError {
    /// Whether this is an authorization denial (policy or secret).
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status: 401 | 403,
                ..
            }
        )
    }
}

/// JSON client for the hosted backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new client from configuration.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| BackendError::Request("backend URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(["rest", "v1"]);
            path.extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .access_token
            .as_ref()
            .unwrap_or(&self.api_key)
            .expose_secret()
            .to_string();
        self.client
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer)
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Select rows from a collection.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, policy denial, or an
    /// undecodable body.
    #[instrument(skip(self, filter), fields(table = %table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::GET, url)
            .query(&[("select", "*")])
            .query(filter.as_query())
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Response(e.to_string()))
    }

    /// Count rows matching a filter without fetching them.
    ///
    /// Uses an exact-count header with a zero-row range; the total comes
    /// back in `Content-Range` as `0-0/<total>` or `*/<total>`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, policy denial, or a missing
    /// or malformed count header.
    #[instrument(skip(self, filter), fields(table = %table))]
    pub async fn count(&self, table: &str, filter: &Filter) -> Result<u64, BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::GET, url)
            .query(&[("select", "id")])
            .query(filter.as_query())
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        // 416 means the range is past the end, i.e. zero matching rows
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(0);
        }
        let response = Self::check(response).await?;
        parse_content_range(response.headers())
    }

    /// Insert a row into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or policy denial.
    #[instrument(skip(self, row), fields(table = %table))]
    pub async fn insert<T: Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Self::check(response).await.map(drop)
    }

    /// Update rows matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or policy denial.
    #[instrument(skip(self, filter, patch), fields(table = %table))]
    pub async fn update<T: Serialize + Sync>(
        &self,
        table: &str,
        filter: &Filter,
        patch: &T,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::PATCH, url)
            .query(filter.as_query())
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Self::check(response).await.map(drop)
    }

    /// Insert-or-update a row, merging on a conflict column.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or policy denial.
    #[instrument(skip(self, row), fields(table = %table, on_conflict = %on_conflict))]
    pub async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::POST, url)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Self::check(response).await.map(drop)
    }

    /// Delete rows matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or policy denial.
    #[instrument(skip(self, filter), fields(table = %table))]
    pub async fn delete(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        let url = self.endpoint(&[table])?;
        let response = self
            .request(Method::DELETE, url)
            .query(filter.as_query())
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Self::check(response).await.map(drop)
    }

    /// Invoke a named remote procedure.
    ///
    /// The payload carries any explicit authorization (the bypass secret);
    /// the backend does its own check against it rather than the ambient
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a rejected secret, or an
    /// undecodable result.
    #[instrument(skip(self, payload), fields(procedure = %name))]
    pub async fn rpc<T: DeserializeOwned, P: Serialize + Sync>(
        &self,
        name: &str,
        payload: &P,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(&["rpc", name])?;
        let response = self
            .request(Method::POST, url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let response = Self::check(response).await?;
        debug!(procedure = %name, "rpc ok");
        response
            .json()
            .await
            .map_err(|e| BackendError::Response(e.to_string()))
    }
}

/// Parse the total out of a `Content-Range` header.
fn parse_content_range(headers: &HeaderMap<HeaderValue>) -> Result<u64, BackendError> {
    let raw = headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BackendError::Response("missing Content-Range header".to_string()))?;
    let total = raw
        .rsplit('/')
        .next()
        .ok_or_else(|| BackendError::Response(format!("malformed Content-Range: {raw}")))?;
    total
        .parse::<u64>()
        .map_err(|_| BackendError::Response(format!("malformed Content-Range: {raw}")))
}
