//! Anthropic Messages API adapter.
//!
//! Differences from the OpenAI-style adapter:
//! - Response text lives at `content[0].text` instead of `choices[0].message.content`.
//! - Credentials go in `x-api-key`, and every call names an `anthropic-version`.
//!
//! Through the forwarding proxy the system prompt stays in the message list and the
//! proxy rewrites it. When the endpoint is the vendor host itself
//! (`api.anthropic.com`), the system prompt moves to the top-level `system` field
//! because the Messages API rejects a `system` role inside `messages`.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ProviderEndpoint;
use crate::error::InvocationError;
use crate::registry::ProviderKind;
use crate::transport::HttpTransport;
use crate::types::{CanonicalRequest, Message};

use super::{send_json, ProviderAdapter, WireRequest};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_API_HOST: &str = "api.anthropic.com";

/// Anthropic Messages API adapter.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    endpoint: ProviderEndpoint,
    transport: HttpTransport,
    top_level_system: bool,
}

impl AnthropicAdapter {
    pub fn new(endpoint: ProviderEndpoint, transport: HttpTransport) -> Self {
        let top_level_system = url::Url::parse(&endpoint.url())
            .ok()
            .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(ANTHROPIC_API_HOST)))
            .unwrap_or(false);
        Self {
            endpoint,
            transport,
            top_level_system,
        }
    }

    /// Whether requests use the vendor's native top-level `system` field.
    pub fn uses_top_level_system(&self) -> bool {
        self.top_level_system
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build_request(&self, request: &CanonicalRequest, model: &str) -> WireRequest {
        let body = if self.top_level_system {
            serde_json::json!({
                "model": model,
                "system": request.system_prompt,
                "messages": [Message::user(request.user_prompt.as_str())],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            })
        } else {
            serde_json::json!({
                "model": model,
                "messages": request.messages(),
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            })
        };

        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), ANTHROPIC_VERSION.into());
        if let Some(key) = &self.endpoint.api_key {
            headers.insert("x-api-key".into(), key.clone());
        }

        WireRequest {
            url: self.endpoint.url(),
            headers,
            body,
        }
    }

    async fn invoke(&self, wire: &WireRequest) -> Result<Value, InvocationError> {
        send_json(&self.transport, wire).await
    }

    fn extract_text(&self, body: &Value) -> Result<String, InvocationError> {
        // { content: [{type: "text", text: "..."}], stop_reason, usage }
        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| InvocationError::malformed("response has no 'content' array"))?;
        let first = blocks
            .first()
            .ok_or_else(|| InvocationError::malformed("response 'content' array is empty"))?;
        first
            .get("text")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| InvocationError::malformed("missing content[0].text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn adapter(key: Option<&str>) -> AnthropicAdapter {
        let mut endpoint = ProviderEndpoint::new("https://api.anthropic.com/v1", "messages");
        endpoint.api_key = key.map(String::from);
        AnthropicAdapter::new(endpoint, HttpTransport::new(None).unwrap())
    }

    #[test]
    fn test_anthropic_build_request() {
        let req = CanonicalRequest::new("Hello").with_max_tokens(1024);
        let wire = adapter(Some("ak")).build_request(&req, "claude-3-5-sonnet-20241022");
        assert_eq!(wire.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(wire.body["max_tokens"], 1024);
        assert_eq!(wire.body["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(wire.body["system"], req.system_prompt.as_str());
        let messages = wire.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Hello");
        assert_eq!(wire.headers.get("x-api-key").unwrap(), "ak");
        assert_eq!(wire.headers.get("anthropic-version").unwrap(), ANTHROPIC_VERSION);
    }

    #[test]
    fn test_proxy_endpoint_keeps_system_message() {
        let proxied = AnthropicAdapter::new(
            ProviderEndpoint::new("http://localhost:3001/api", "anthropic"),
            HttpTransport::new(None).unwrap(),
        );
        assert!(!proxied.uses_top_level_system());

        let req = CanonicalRequest::new("Hello").with_system_prompt("Be terse.");
        let wire = proxied.build_request(&req, "claude-3-haiku-20240307");
        assert!(wire.body.get("system").is_none());
        assert_eq!(wire.body["messages"][0]["role"], "system");
        assert_eq!(wire.body["messages"][0]["content"], "Be terse.");
        assert_eq!(wire.body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_direct_config_targets_vendor_format() {
        let config = crate::config::ArenaConfig::direct();
        let direct = AnthropicAdapter::new(config.anthropic, HttpTransport::new(None).unwrap());
        assert!(direct.uses_top_level_system());
    }

    #[test]
    fn test_no_key_no_credential_header() {
        let wire = adapter(None).build_request(&CanonicalRequest::new("x"), "m");
        assert!(!wire.headers.contains_key("x-api-key"));
    }

    #[test]
    fn test_anthropic_extract_text() {
        let body = serde_json::json!({"content": [{"text": "Hi"}]});
        assert_eq!(adapter(None).extract_text(&body).unwrap(), "Hi");
    }

    #[test]
    fn test_anthropic_malformed_shapes() {
        for body in [
            serde_json::json!({}),
            serde_json::json!({"content": []}),
            serde_json::json!({"content": [{"type": "tool_use", "id": "t1"}]}),
        ] {
            let err = adapter(None).extract_text(&body).unwrap_err();
            assert_eq!(err.kind(), FailureKind::MalformedResponse);
        }
    }
}
