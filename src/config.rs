//! Provider endpoint configuration.
//!
//! Base URLs, credentials and the HTTP timeout are held in an explicit [`ArenaConfig`]
//! that is handed to each adapter when it is built. Nothing in the library reads the
//! process environment except the `from_env` constructors.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, ErrorContext};
use crate::registry::ProviderKind;
use crate::Result;

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3001/api";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Where one provider kind is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// `<base_url>/<path>` with exactly one slash between the two.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Endpoints for every provider kind plus transport knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub openai: ProviderEndpoint,
    pub anthropic: ProviderEndpoint,
    pub local: ProviderEndpoint,
    /// Per-request HTTP timeout. `None` leaves the transport default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::proxy(DEFAULT_PROXY_URL)
    }
}

impl ArenaConfig {
    /// Route every provider through the forwarding proxy at `base_url`.
    pub fn proxy(base_url: &str) -> Self {
        Self {
            openai: ProviderEndpoint::new(base_url, "openai"),
            anthropic: ProviderEndpoint::new(base_url, "anthropic"),
            local: ProviderEndpoint::new(base_url, "ollama"),
            timeout_secs: None,
        }
    }

    /// Talk to vendor endpoints directly. The Anthropic adapter switches to the
    /// vendor's top-level `system` field for `api.anthropic.com`.
    pub fn direct() -> Self {
        Self {
            openai: ProviderEndpoint::new(OPENAI_API_URL, "chat/completions"),
            anthropic: ProviderEndpoint::new(ANTHROPIC_API_URL, "messages"),
            local: ProviderEndpoint::new(OLLAMA_URL, "api/generate"),
            timeout_secs: None,
        }
    }

    /// Proxy configuration, overridable via env:
    /// - `ARENA_PROXY_URL`
    /// - `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`
    /// - `ARENA_HTTP_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(false, |k| std::env::var(k).ok())
    }

    /// Direct-to-vendor configuration; additionally honours `OLLAMA_BASE_URL`.
    pub fn direct_from_env() -> Self {
        Self::from_lookup(true, |k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup(direct: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut cfg = if direct {
            let mut cfg = Self::direct();
            if let Some(url) = non_empty("OLLAMA_BASE_URL") {
                cfg.local.base_url = url;
            }
            cfg
        } else {
            match non_empty("ARENA_PROXY_URL") {
                Some(url) => Self::proxy(&url),
                None => Self::default(),
            }
        };

        cfg.openai.api_key = non_empty("OPENAI_API_KEY");
        cfg.anthropic.api_key = non_empty("ANTHROPIC_API_KEY");
        cfg.timeout_secs = non_empty("ARENA_HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok());
        cfg
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: ArenaConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn endpoint(&self, kind: ProviderKind) -> &ProviderEndpoint {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Local => &self.local,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Every endpoint must resolve to an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for kind in ProviderKind::ALL {
            let endpoint = self.endpoint(kind);
            let field = format!("{}.base_url", kind);
            let parsed = url::Url::parse(&endpoint.url()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid endpoint URL '{}'", endpoint.url()),
                    ErrorContext::new()
                        .with_field_path(field.clone())
                        .with_details(e.to_string())
                        .with_source("arena_config"),
                )
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::configuration_with_context(
                    format!("unsupported URL scheme '{}'", parsed.scheme()),
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("arena_config"),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::configuration_with_context(
                "timeout_secs must be positive",
                ErrorContext::new()
                    .with_field_path("timeout_secs")
                    .with_source("arena_config"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_default_targets_proxy() {
        let cfg = ArenaConfig::default();
        assert_eq!(cfg.openai.url(), "http://localhost:3001/api/openai");
        assert_eq!(cfg.anthropic.url(), "http://localhost:3001/api/anthropic");
        assert_eq!(cfg.local.url(), "http://localhost:3001/api/ollama");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_direct_urls() {
        let cfg = ArenaConfig::direct();
        assert_eq!(cfg.openai.url(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(cfg.anthropic.url(), "https://api.anthropic.com/v1/messages");
        assert_eq!(cfg.local.url(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_url_join_normalizes_slashes() {
        let ep = ProviderEndpoint::new("http://h:1/api/", "/openai");
        assert_eq!(ep.url(), "http://h:1/api/openai");
    }

    #[test]
    fn test_env_overlay() {
        let cfg = ArenaConfig::from_lookup(
            false,
            lookup(&[
                ("ARENA_PROXY_URL", "http://proxy:9000/api"),
                ("OPENAI_API_KEY", "sk-test"),
                ("ANTHROPIC_API_KEY", "  "),
                ("ARENA_HTTP_TIMEOUT_SECS", "12"),
            ]),
        );
        assert_eq!(cfg.local.url(), "http://proxy:9000/api/ollama");
        assert_eq!(cfg.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.anthropic.api_key, None);
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_direct_env_overrides_ollama() {
        let cfg = ArenaConfig::from_lookup(true, lookup(&[("OLLAMA_BASE_URL", "http://gpu:11434")]));
        assert_eq!(cfg.local.url(), "http://gpu:11434/api/generate");
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn test_yaml_roundtrip_and_validation() {
        let yaml = r#"
openai: { base_url: "http://localhost:4010/v1", path: chat/completions, api_key: k }
anthropic: { base_url: "http://localhost:4010/v1", path: messages }
local: { base_url: "ftp://nowhere", path: api/generate }
"#;
        let err = ArenaConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let ok = yaml.replace("ftp://nowhere", "http://localhost:11434");
        let cfg = ArenaConfig::from_yaml_str(&ok).unwrap();
        assert_eq!(cfg.openai.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.endpoint(ProviderKind::Local).url(), "http://localhost:11434/api/generate");
    }
}
