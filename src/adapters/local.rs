//! Local inference adapter (Ollama `generate` API).
//!
//! The generate API takes a single prompt string, so the message list is flattened
//! into a `"role: content"` transcript. `max_tokens` has no counterpart and is not
//! sent; `temperature` is passed through as-is whether or not the server uses it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ProviderEndpoint;
use crate::error::InvocationError;
use crate::registry::ProviderKind;
use crate::transport::HttpTransport;
use crate::types::message::flatten_transcript;
use crate::types::CanonicalRequest;

use super::{send_json, ProviderAdapter, WireRequest};

#[derive(Debug, Clone)]
pub struct LocalAdapter {
    endpoint: ProviderEndpoint,
    transport: HttpTransport,
}

impl LocalAdapter {
    pub fn new(endpoint: ProviderEndpoint, transport: HttpTransport) -> Self {
        Self {
            endpoint,
            transport,
        }
    }
}

#[async_trait]
impl ProviderAdapter for LocalAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn build_request(&self, request: &CanonicalRequest, model: &str) -> WireRequest {
        let body = serde_json::json!({
            "model": model,
            "prompt": flatten_transcript(&request.messages()),
            "temperature": request.temperature,
            "stream": false,
        });

        WireRequest {
            url: self.endpoint.url(),
            headers: HashMap::new(),
            body,
        }
    }

    async fn invoke(&self, wire: &WireRequest) -> Result<Value, InvocationError> {
        send_json(&self.transport, wire).await
    }

    fn extract_text(&self, body: &Value) -> Result<String, InvocationError> {
        body.get("response")
            .and_then(|r| r.as_str())
            .map(String::from)
            .ok_or_else(|| InvocationError::malformed("missing 'response' field"))
    }
}
