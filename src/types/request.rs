//! Canonical, provider-agnostic request.

use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::error::{Error, ErrorContext};
use crate::Result;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// One prompt plus generation parameters. Every provider call of a round reads
/// the same instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CanonicalRequest {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: user_prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Ordered `[system, user]` message list.
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.as_str()),
            Message::user(self.user_prompt.as_str()),
        ]
    }

    pub fn has_prompt(&self) -> bool {
        !self.user_prompt.trim().is_empty()
    }

    /// Check the caller contract: non-blank prompt and parameters in range.
    pub fn validate(&self) -> Result<()> {
        if !self.has_prompt() {
            return Err(Error::validation_with_context(
                "user prompt must not be empty",
                ErrorContext::new()
                    .with_field_path("request.user_prompt")
                    .with_source("request_validator"),
            ));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::validation_with_context(
                "temperature out of range",
                ErrorContext::new()
                    .with_field_path("request.temperature")
                    .with_details(format!(
                        "expected {}..={}, got {}",
                        MIN_TEMPERATURE, MAX_TEMPERATURE, self.temperature
                    ))
                    .with_source("request_validator"),
            ));
        }
        if self.max_tokens == 0 {
            return Err(Error::validation_with_context(
                "max_tokens must be positive",
                ErrorContext::new()
                    .with_field_path("request.max_tokens")
                    .with_source("request_validator"),
            ));
        }
        Ok(())
    }
}

impl Default for CanonicalRequest {
    fn default() -> Self {
        Self::new("")
    }
}
