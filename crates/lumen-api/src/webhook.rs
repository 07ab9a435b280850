//! HTTP client for the external content-generation webhooks.
//!
//! Each result category maps to one webhook URL. A call posts the request
//! payload as JSON and expects a JSON body back. There are no retries; the
//! cache records whatever failure comes back.

use std::{collections::HashMap, sync::Arc, time::Duration};

use lumen_core::category::ResultCategory;
use reqwest::Client;
use thiserror::Error;

/// Upstream generation is slow; anything past this is treated as failed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum WebhookError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request to {endpoint} failed: {source}")]
  Request {
    endpoint: String,
    #[source]
    source:   reqwest::Error,
  },

  #[error("{endpoint} responded with status {status}")]
  Status { endpoint: String, status: u16 },

  #[error("{endpoint} returned an empty body")]
  EmptyBody { endpoint: String },

  #[error("{endpoint} returned invalid JSON: {source}")]
  InvalidJson {
    endpoint: String,
    #[source]
    source:   serde_json::Error,
  },
}

/// Async client for the generation webhooks.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WebhookClient {
  client:    Client,
  endpoints: Arc<HashMap<ResultCategory, String>>,
}

impl WebhookClient {
  pub fn new(
    endpoints: HashMap<ResultCategory, String>,
    timeout: Duration,
  ) -> Result<Self, WebhookError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(WebhookError::Client)?;
    Ok(Self { client, endpoints: Arc::new(endpoints) })
  }

  /// The configured webhook for `category`, if any.
  pub fn endpoint(&self, category: ResultCategory) -> Option<&str> {
    self.endpoints.get(&category).map(String::as_str)
  }

  /// `POST` `payload` to `endpoint` and parse the JSON reply.
  pub async fn call(
    &self,
    endpoint: &str,
    payload: &serde_json::Value,
  ) -> Result<serde_json::Value, WebhookError> {
    let request_error = |source| WebhookError::Request {
      endpoint: endpoint.to_owned(),
      source,
    };

    let resp = self
      .client
      .post(endpoint)
      .json(payload)
      .send()
      .await
      .map_err(request_error)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(WebhookError::Status {
        endpoint: endpoint.to_owned(),
        status:   status.as_u16(),
      });
    }

    let body = resp.text().await.map_err(request_error)?;
    if body.trim().is_empty() {
      return Err(WebhookError::EmptyBody { endpoint: endpoint.to_owned() });
    }

    serde_json::from_str(&body).map_err(|source| WebhookError::InvalidJson {
      endpoint: endpoint.to_owned(),
      source,
    })
  }
}
