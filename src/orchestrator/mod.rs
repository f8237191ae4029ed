//! # Invocation orchestrator
//!
//! Fans one [`CanonicalRequest`] out to every selected model at once and reports
//! each model's result the moment its own call settles.
//!
//! ## Guarantees
//!
//! - Every selected id gets exactly one terminal [`RoundUpdate`].
//! - Pipelines are isolated: a failure, a panic or a slow call in one never delays,
//!   cancels or alters another.
//! - There is no overall timeout and no cancellation. A superseded round keeps
//!   running; its updates carry the old [`RoundId`] and are dropped by
//!   [`RoundBoard::apply`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use prompt_arena::{ArenaConfig, CanonicalRequest, InvocationOrchestrator, ModelCatalog, RoundBoard};
//!
//! #[tokio::main]
//! async fn main() -> prompt_arena::Result<()> {
//!     let orchestrator =
//!         InvocationOrchestrator::from_config(ModelCatalog::builtin(), &ArenaConfig::from_env())?;
//!
//!     let mut handle = orchestrator.run_round(
//!         CanonicalRequest::new("Write a haiku about ownership"),
//!         ["gpt-4o", "claude-3-5-sonnet-20241022", "llama3"],
//!     )?;
//!
//!     let mut board = RoundBoard::new();
//!     board.begin(&handle);
//!     while let Some(update) = handle.recv().await {
//!         let id = update.model_id.clone();
//!         if board.apply(update) {
//!             println!("{id}: {}", board.state(&id).unwrap().display_text());
//!         }
//!     }
//!     assert!(board.is_settled());
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod state;

pub use board::RoundBoard;
pub use state::{InvocationState, RoundId, RoundUpdate};

use futures::{FutureExt, Stream};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapters::{adapters_from_config, ProviderAdapter};
use crate::config::ArenaConfig;
use crate::error::{Error, ErrorContext, InvocationError};
use crate::registry::{ModelCatalog, ProviderKind};
use crate::types::CanonicalRequest;
use crate::Result;

type AdapterMap = HashMap<ProviderKind, Arc<dyn ProviderAdapter>>;

/// Dispatches invocation rounds across provider adapters.
///
/// The catalog and adapters are read-only after construction and shared with every
/// pipeline task, so one orchestrator can serve any number of rounds.
pub struct InvocationOrchestrator {
    catalog: Arc<ModelCatalog>,
    adapters: Arc<AdapterMap>,
    next_round: AtomicU64,
}

impl InvocationOrchestrator {
    /// Build from explicit adapters. A later adapter for the same kind replaces an
    /// earlier one.
    pub fn new(
        catalog: ModelCatalog,
        adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>,
    ) -> Self {
        let adapters: AdapterMap = adapters.into_iter().map(|a| (a.kind(), a)).collect();
        Self {
            catalog: Arc::new(catalog),
            adapters: Arc::new(adapters),
            next_round: AtomicU64::new(0),
        }
    }

    /// Build with the HTTP-backed adapter for every provider kind.
    pub fn from_config(catalog: ModelCatalog, config: &ArenaConfig) -> Result<Self> {
        Ok(Self::new(catalog, adapters_from_config(config)?))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn adapter(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind)
    }

    /// Start a round: one concurrent pipeline per distinct selected id.
    ///
    /// Rejects a blank prompt, an empty selection or out-of-range parameters with
    /// [`Error::Validation`] before any state exists or any adapter is called.
    ///
    /// Returns [`Error::Configuration`] when called outside a Tokio runtime.
    pub fn run_round<I, S>(&self, request: CanonicalRequest, selected: I) -> Result<RoundHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model_ids = dedup_preserving_order(selected);
        if model_ids.is_empty() {
            return Err(Error::validation_with_context(
                "at least one model must be selected",
                ErrorContext::new()
                    .with_field_path("selected_models")
                    .with_source("round_validator"),
            ));
        }
        request.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                "invocation rounds must be started inside a Tokio runtime",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("round_dispatcher"),
            )
        })?;

        let round = RoundId(self.next_round.fetch_add(1, Ordering::Relaxed) + 1);
        let request = Arc::new(request);
        let (tx, rx) = mpsc::unbounded_channel();
        let remaining = Arc::new(AtomicUsize::new(model_ids.len()));

        info!(%round, models = model_ids.len(), "starting invocation round");

        for model_id in &model_ids {
            let pipeline = Pipeline {
                round,
                model_id: model_id.clone(),
                request: Arc::clone(&request),
                catalog: Arc::clone(&self.catalog),
                adapters: Arc::clone(&self.adapters),
            };
            let tx = tx.clone();
            let remaining = Arc::clone(&remaining);

            runtime.spawn(async move {
                let model_id = pipeline.model_id.clone();
                let state = pipeline.run().await;
                // The count reaches zero before the last update becomes visible.
                remaining.fetch_sub(1, Ordering::AcqRel);
                // A closed receiver means the caller abandoned the round.
                let _ = tx.send(RoundUpdate {
                    round,
                    model_id,
                    state,
                });
            });
        }

        Ok(RoundHandle {
            round,
            model_ids,
            rx,
            remaining,
        })
    }
}

impl std::fmt::Debug for InvocationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort();
        f.debug_struct("InvocationOrchestrator")
            .field("models", &self.catalog.len())
            .field("adapters", &kinds)
            .field("rounds_started", &self.next_round.load(Ordering::Relaxed))
            .finish()
    }
}

fn dedup_preserving_order<I, S>(selected: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    selected
        .into_iter()
        .map(Into::into)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// resolve -> adapter -> build -> invoke -> extract, for one model.
struct Pipeline {
    round: RoundId,
    model_id: String,
    request: Arc<CanonicalRequest>,
    catalog: Arc<ModelCatalog>,
    adapters: Arc<AdapterMap>,
}

impl Pipeline {
    /// Always yields a terminal state; panics inside the call are caught here.
    async fn run(self) -> InvocationState {
        let round = self.round;
        let model_id = self.model_id.clone();

        let outcome = AssertUnwindSafe(self.execute()).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(InvocationError::Aborted(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(text) => debug!(%round, model = %model_id, chars = text.len(), "model succeeded"),
            Err(e) => warn!(%round, model = %model_id, kind = %e.kind(), error = %e, "model failed"),
        }
        result.into()
    }

    async fn execute(&self) -> std::result::Result<String, InvocationError> {
        let descriptor = self
            .catalog
            .get(&self.model_id)
            .ok_or_else(|| InvocationError::UnknownModel(self.model_id.clone()))?;
        let adapter = self
            .adapters
            .get(&descriptor.provider)
            .ok_or_else(|| InvocationError::UnsupportedProvider(descriptor.provider.to_string()))?;

        debug!(round = %self.round, model = %descriptor.id, provider = %descriptor.provider, "dispatching");
        adapter.complete(&self.request, &descriptor.id).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

/// Caller's side of a running round.
///
/// Yields one terminal [`RoundUpdate`] per selected model, in completion order, and
/// ends once every pipeline has reported. Also usable as a [`Stream`].
#[derive(Debug)]
pub struct RoundHandle {
    round: RoundId,
    model_ids: Vec<String>,
    rx: mpsc::UnboundedReceiver<RoundUpdate>,
    remaining: Arc<AtomicUsize>,
}

impl RoundHandle {
    pub fn round(&self) -> RoundId {
        self.round
    }

    /// Selected ids in selection order, duplicates removed.
    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    /// The initial `Pending` update for every selected model.
    pub fn pending_updates(&self) -> Vec<RoundUpdate> {
        self.model_ids
            .iter()
            .map(|id| RoundUpdate {
                round: self.round,
                model_id: id.clone(),
                state: InvocationState::Pending,
            })
            .collect()
    }

    /// True once every pipeline of this round has emitted its terminal update.
    pub fn is_settled(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    /// Next terminal update, or `None` once all have been delivered.
    pub async fn recv(&mut self) -> Option<RoundUpdate> {
        self.rx.recv().await
    }

    /// Wait for every model and return final states in selection order.
    pub async fn settle(mut self) -> Vec<(String, InvocationState)> {
        let mut states: HashMap<String, InvocationState> = HashMap::new();
        while let Some(update) = self.rx.recv().await {
            states.entry(update.model_id).or_insert(update.state);
        }
        self.model_ids
            .into_iter()
            .map(|id| {
                let state = states.remove(&id).unwrap_or_else(|| {
                    InvocationError::Aborted("pipeline ended without reporting".into()).into()
                });
                (id, state)
            })
            .collect()
    }
}

impl Stream for RoundHandle {
    type Item = RoundUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserving_order() {
        let ids = dedup_preserving_order(["b", "a", "b", "c", "a"]);
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "pipeline panicked");
    }

    #[tokio::test]
    async fn test_empty_selection_rejected() {
        let orchestrator = InvocationOrchestrator::new(ModelCatalog::builtin(), Vec::new());
        let err = orchestrator
            .run_round(CanonicalRequest::new("Hi"), Vec::<String>::new())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_unknown_and_unsupported_models_fail_locally() {
        // No adapters registered at all.
        let orchestrator = InvocationOrchestrator::new(ModelCatalog::builtin(), Vec::new());
        let handle = orchestrator
            .run_round(CanonicalRequest::new("Hi"), ["gpt-4o", "not-a-model"])
            .unwrap();
        let states = handle.settle().await;
        assert_eq!(states.len(), 2);
        assert_eq!(
            states[0].1.failure().map(|f| f.0),
            Some(crate::error::FailureKind::UnsupportedProvider)
        );
        assert_eq!(
            states[1].1.failure().map(|f| f.0),
            Some(crate::error::FailureKind::UnknownModel)
        );
    }

    #[test]
    fn test_outside_runtime_is_an_error() {
        let orchestrator = InvocationOrchestrator::new(ModelCatalog::builtin(), Vec::new());
        let err = orchestrator
            .run_round(CanonicalRequest::new("Hi"), ["gpt-4o"])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_round_ids_increase() {
        let orchestrator = InvocationOrchestrator::new(ModelCatalog::builtin(), Vec::new());
        let a = orchestrator.run_round(CanonicalRequest::new("x"), ["o1"]).unwrap();
        let b = orchestrator.run_round(CanonicalRequest::new("x"), ["o1"]).unwrap();
        assert!(b.round() > a.round());
    }
}
