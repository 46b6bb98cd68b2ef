// SPDX-License-Identifier: MIT

//! HTTP client for the completion server.
//!
//! The wire contract is deliberately loose: the request body is a
//! one-element JSON list containing the prefix, and the response may be a
//! JSON string, an array whose first element is a string, an object with a
//! `text` field, or anything else — in which case the raw body is used as
//! the predicted text. Cancellation is handled above this layer by
//! aborting the fetch task; an aborted request produces no error.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Errors from one completion request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion server returned {0}")]
    Status(reqwest::StatusCode),
}

/// Seam between the engine and the completion server. Lets tests drive the
/// engine with a deterministic backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Fetch the raw predicted text for `prefix`. Normalization into a
    /// candidate suffix happens at the boundary above, not here.
    async fn complete(&self, prefix: &str) -> Result<String, FetchError>;
}

/// Completion over HTTP POST to an assistant's base URL.
pub struct HttpCompletionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCompletionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    async fn complete(&self, prefix: &str) -> Result<String, FetchError> {
        debug!(
            url = %self.base_url,
            prefix_chars = prefix.chars().count(),
            "requesting completion"
        );
        let resp = self
            .http
            .post(&self.base_url)
            .json(&[prefix])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = resp.text().await?;
        Ok(predicted_from_body(&body))
    }
}

/// Extract the predicted text from a response body.
///
/// Accepted shapes: a JSON string, an array whose first element is a
/// string, an object with a string `text` field. Any other shape
/// (including invalid JSON) is treated as a plain-text body — a malformed
/// response is still a usable completion.
pub fn predicted_from_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(s)) => s,
        Ok(Value::Array(items)) => match items.into_iter().next() {
            Some(Value::String(s)) => s,
            _ => body.to_string(),
        },
        Ok(Value::Object(mut map)) => match map.remove("text") {
            Some(Value::String(s)) => s,
            _ => body.to_string(),
        },
        _ => body.to_string(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
