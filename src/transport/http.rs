use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::ArenaConfig;
use crate::Result;

/// Status line and decoded body of one provider reply, before any
/// provider-specific interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Canonical reason phrase (e.g. "Internal Server Error").
    pub status_text: String,
    /// `None` when the body is empty or not JSON.
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client used by every adapter. One instance is cloned into each
/// adapter; `reqwest::Client` pools connections internally.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ArenaConfig) -> Result<Self> {
        Self::new(config.timeout())
    }

    /// POST `body` as JSON to `url`. Non-2xx statuses are returned, not raised;
    /// only failures to complete the exchange are errors.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut request = self.client.post(url).json(body);
        for (k, v) in headers {
            request = request.header(k.as_str(), v.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let status_text = status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Short message suitable for a model's result slot.
    pub fn display_message(&self) -> String {
        match self {
            TransportError::Http(e) if e.is_timeout() => "request timed out".to_string(),
            TransportError::Http(e) if e.is_connect() => {
                format!("connection failed: {}", e)
            }
            TransportError::Http(e) => format!("network error: {}", e),
            TransportError::Other(msg) => msg.clone(),
        }
    }
}
