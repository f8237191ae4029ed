use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.temperature", "openai.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "catalog_loader", "round_validator")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Crate-level error.
///
/// Only caller-contract violations and setup problems surface here. Failures of an
/// individual provider call never do; they become [`InvocationError`]s attached to
/// that model's state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

/// Category of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, DNS, TLS or transport-level timeout.
    Transport,
    /// The provider answered with a non-2xx status.
    Upstream,
    /// 2xx answer whose envelope lacks the expected field.
    MalformedResponse,
    /// Selected id is not in the catalog.
    UnknownModel,
    /// No adapter registered for the model's provider kind.
    UnsupportedProvider,
    /// The pipeline panicked before settling.
    Aborted,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Transport => "transport",
            FailureKind::Upstream => "upstream",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::UnknownModel => "unknown_model",
            FailureKind::UnsupportedProvider => "unsupported_provider",
            FailureKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Failure of one model's pipeline. Display is the single human-readable message
/// shown in that model's slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("{message}")]
    Transport { message: String },

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{message}")]
    MalformedResponse { message: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No adapter registered for provider '{0}'")]
    UnsupportedProvider(String),

    #[error("Invocation aborted: {0}")]
    Aborted(String),
}

impl InvocationError {
    pub fn transport(message: impl Into<String>) -> Self {
        InvocationError::Transport {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        InvocationError::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            InvocationError::Transport { .. } => FailureKind::Transport,
            InvocationError::Upstream { .. } => FailureKind::Upstream,
            InvocationError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            InvocationError::UnknownModel(_) => FailureKind::UnknownModel,
            InvocationError::UnsupportedProvider(_) => FailureKind::UnsupportedProvider,
            InvocationError::Aborted(_) => FailureKind::Aborted,
        }
    }

    /// HTTP status for upstream failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            InvocationError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<crate::transport::TransportError> for InvocationError {
    fn from(e: crate::transport::TransportError) -> Self {
        InvocationError::transport(e.display_message())
    }
}
