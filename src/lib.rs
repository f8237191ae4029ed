//! # prompt-arena
//!
//! Send one prompt to several language-model providers at once and collect each
//! completion independently.
//!
//! ## Overview
//!
//! A round fans a single [`CanonicalRequest`] out to every selected model. Each model
//! runs its own pipeline (resolve, build, invoke, extract) on its own task, and its
//! result is reported the moment its call settles. A slow or failing provider never
//! holds back or corrupts another provider's result.
//!
//! ## Key Features
//!
//! - **Provider adapters**: OpenAI-style chat, Anthropic-style messages and a local
//!   Ollama-style generate API behind one [`ProviderAdapter`] trait
//! - **Uniform results**: every reply or failure becomes an [`InvocationState`]
//! - **Round stamping**: [`RoundBoard`] drops late updates from superseded rounds
//! - **Explicit configuration**: endpoints and credentials live in [`ArenaConfig`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prompt_arena::{ArenaConfig, CanonicalRequest, InvocationOrchestrator, ModelCatalog};
//!
//! #[tokio::main]
//! async fn main() -> prompt_arena::Result<()> {
//!     let orchestrator =
//!         InvocationOrchestrator::from_config(ModelCatalog::builtin(), &ArenaConfig::from_env())?;
//!
//!     let handle = orchestrator.run_round(
//!         CanonicalRequest::new("Hello, how are you?"),
//!         ModelCatalog::default_selection(),
//!     )?;
//!
//!     for (model, state) in handle.settle().await {
//!         println!("{model}: {}", state.display_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | Round dispatch, per-model state, consumer-side board |
//! | [`adapters`] | Provider request/response mapping |
//! | [`registry`] | Model catalog and provider kinds |
//! | [`config`] | Endpoints, credentials, timeout |
//! | [`transport`] | Shared HTTP client |
//! | [`types`] | Messages and the canonical request |

pub mod adapters;
pub mod config;
pub mod orchestrator;
pub mod registry;
pub mod transport;
pub mod types;

pub use adapters::{ProviderAdapter, WireRequest};
pub use config::{ArenaConfig, ProviderEndpoint};
pub use orchestrator::{
    InvocationOrchestrator, InvocationState, RoundBoard, RoundHandle, RoundId, RoundUpdate,
};
pub use registry::{ModelCatalog, ModelDescriptor, ProviderKind};
pub use types::{
    message::{Message, MessageRole},
    CanonicalRequest,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, FailureKind, InvocationError};
