//! Model catalog: which model ids exist and which provider serves each.
//!
//! The catalog is read-only once built and is shared across rounds behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, ErrorContext};
use crate::Result;

/// Provider API family a model is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI-style chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic-style messages.
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Local inference server (Ollama generate API).
    #[serde(rename = "local", alias = "ollama")]
    Local,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Local => "local",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "local" | "ollama" => Ok(ProviderKind::Local),
            other => Err(Error::configuration_with_context(
                format!("unknown provider kind '{}'", other),
                ErrorContext::new().with_details("expected one of: openai, anthropic, local"),
            )),
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub provider: ProviderKind,
    pub display_name: String,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        provider: ProviderKind,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

/// Ordered, id-unique set of [`ModelDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelCatalog {
    /// Build a catalog; duplicate ids are rejected.
    pub fn new(models: impl IntoIterator<Item = ModelDescriptor>) -> Result<Self> {
        let mut catalog = ModelCatalog::default();
        for model in models {
            if catalog.index.contains_key(&model.id) {
                return Err(Error::configuration_with_context(
                    format!("duplicate model id '{}'", model.id),
                    ErrorContext::new()
                        .with_field_path("models[].id")
                        .with_source("catalog_loader"),
                ));
            }
            catalog.index.insert(model.id.clone(), catalog.models.len());
            catalog.models.push(model);
        }
        Ok(catalog)
    }

    /// The models the playground ships with.
    pub fn builtin() -> Self {
        use ProviderKind::*;
        let entries = [
            ("gpt-4o", OpenAi, "GPT-4o"),
            ("gpt-4o-mini", OpenAi, "GPT-4o Mini"),
            ("o1", OpenAi, "O1 (Reasoning)"),
            ("o1-mini", OpenAi, "O1 Mini"),
            ("gpt-3.5-turbo", OpenAi, "GPT-3.5 Turbo"),
            ("claude-3-5-sonnet-20241022", Anthropic, "Claude 3.5 Sonnet"),
            ("claude-3-opus-20240229", Anthropic, "Claude 3 Opus"),
            ("claude-3-haiku-20240307", Anthropic, "Claude 3 Haiku"),
            ("llama3", Local, "Llama 3"),
            ("mistral", Local, "Mistral"),
            ("codellama", Local, "CodeLlama"),
        ];
        let models: Vec<ModelDescriptor> = entries
            .iter()
            .map(|(id, kind, name)| ModelDescriptor::new(*id, *kind, *name))
            .collect();
        let index = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self { models, index }
    }

    /// Ids selected when the user has not chosen any.
    pub fn default_selection() -> Vec<String> {
        vec!["gpt-4o".to_string(), "claude-3-5-sonnet-20241022".to_string()]
    }

    /// Parse a catalog from YAML of the form `models: [{id, provider, display_name}]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.models)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.index.get(id).map(|&i| &self.models[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn by_provider(&self, kind: ProviderKind) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter().filter(move |m| m.provider == kind)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
