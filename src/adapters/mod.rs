//! Provider adapters: one per [`ProviderKind`], all behind [`ProviderAdapter`].
//!
//! An adapter owns three steps of a model's pipeline:
//! - `build_request`: pure mapping from the canonical request to the provider's body.
//! - `invoke`: exactly one HTTP POST, no retry.
//! - `extract_text`: unwrap the provider envelope to plain text.
//!
//! The orchestrator holds adapters as `Arc<dyn ProviderAdapter>` keyed by kind, so
//! tests can register in-process fakes in place of the HTTP-backed ones.

pub mod anthropic;
pub mod local;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ArenaConfig, ProviderEndpoint};
use crate::error::InvocationError;
use crate::registry::ProviderKind;
use crate::transport::{HttpTransport, RawResponse};
use crate::types::CanonicalRequest;
use crate::Result;

pub use anthropic::AnthropicAdapter;
pub use local::LocalAdapter;

/// Correlation header attached to every provider call.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Provider-specific HTTP request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Target URL (base_url + path).
    pub url: String,
    /// Extra request headers (credentials, API version).
    pub headers: HashMap<String, String>,
    /// JSON request body.
    pub body: Value,
}

/// Capability set shared by every provider kind.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Provider kind this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Map the canonical request onto this provider's body. No I/O.
    fn build_request(&self, request: &CanonicalRequest, model: &str) -> WireRequest;

    /// Perform exactly one call. Non-2xx replies become [`InvocationError::Upstream`].
    async fn invoke(&self, wire: &WireRequest) -> std::result::Result<Value, InvocationError>;

    /// Unwrap the provider envelope to plain text.
    fn extract_text(&self, body: &Value) -> std::result::Result<String, InvocationError>;

    /// build -> invoke -> extract.
    async fn complete(
        &self,
        request: &CanonicalRequest,
        model: &str,
    ) -> std::result::Result<String, InvocationError> {
        let wire = self.build_request(request, model);
        let body = self.invoke(&wire).await?;
        self.extract_text(&body)
    }
}

/// Send a wire request through the shared transport and classify the reply.
pub(crate) async fn send_json(
    transport: &HttpTransport,
    wire: &WireRequest,
) -> std::result::Result<Value, InvocationError> {
    let mut headers = wire.headers.clone();
    headers
        .entry(REQUEST_ID_HEADER.to_string())
        .or_insert_with(|| uuid::Uuid::new_v4().to_string());

    let raw = transport.post_json(&wire.url, &headers, &wire.body).await?;
    if !raw.is_success() {
        return Err(upstream_error(&raw));
    }
    raw.body
        .ok_or_else(|| InvocationError::malformed("response body is not valid JSON"))
}

/// Pick the most specific message for a non-2xx reply: upstream-provided message,
/// then the status text, then a generic line.
pub fn upstream_error(raw: &RawResponse) -> InvocationError {
    let message = raw
        .body
        .as_ref()
        .and_then(upstream_message)
        .or_else(|| {
            let text = raw.status_text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("request failed with status {}", raw.status));

    InvocationError::Upstream {
        status: raw.status,
        message,
    }
}

/// Error text from the common envelopes: `{error: "..."}`, `{error: {message}}`,
/// `{error: {error: {message}}}` (a proxied vendor error) and `{message}`.
pub fn upstream_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("error").and_then(|v| v.as_str()),
        body.pointer("/error/message").and_then(|v| v.as_str()),
        body.pointer("/error/error/message").and_then(|v| v.as_str()),
        body.get("message").and_then(|v| v.as_str()),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// OpenAI-style chat completions adapter.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    endpoint: ProviderEndpoint,
    transport: HttpTransport,
}

impl OpenAiAdapter {
    pub fn new(endpoint: ProviderEndpoint, transport: HttpTransport) -> Self {
        Self {
            endpoint,
            transport,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn build_request(&self, request: &CanonicalRequest, model: &str) -> WireRequest {
        let body = serde_json::json!({
            "model": model,
            "messages": request.messages(),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let mut headers = HashMap::new();
        if let Some(key) = &self.endpoint.api_key {
            headers.insert("authorization".into(), format!("Bearer {}", key));
        }

        WireRequest {
            url: self.endpoint.url(),
            headers,
            body,
        }
    }

    async fn invoke(&self, wire: &WireRequest) -> std::result::Result<Value, InvocationError> {
        send_json(&self.transport, wire).await
    }

    fn extract_text(&self, body: &Value) -> std::result::Result<String, InvocationError> {
        let choices = body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| InvocationError::malformed("response has no 'choices' array"))?;
        let first = choices
            .first()
            .ok_or_else(|| InvocationError::malformed("response 'choices' array is empty"))?;
        first
            .pointer("/message/content")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| InvocationError::malformed("missing choices[0].message.content"))
    }
}

/// Build the HTTP-backed adapter for one provider kind.
pub fn create_adapter(
    kind: ProviderKind,
    endpoint: ProviderEndpoint,
    transport: HttpTransport,
) -> Arc<dyn ProviderAdapter> {
    match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(endpoint, transport)),
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(endpoint, transport)),
        ProviderKind::Local => Arc::new(LocalAdapter::new(endpoint, transport)),
    }
}

/// One adapter per provider kind, sharing a single transport.
pub fn adapters_from_config(config: &ArenaConfig) -> Result<Vec<Arc<dyn ProviderAdapter>>> {
    config.validate()?;
    let transport = HttpTransport::from_config(config)?;
    Ok(ProviderKind::ALL
        .iter()
        .map(|&kind| create_adapter(kind, config.endpoint(kind).clone(), transport.clone()))
        .collect())
}
