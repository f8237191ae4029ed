//! In-process adapter fakes for orchestration tests

#![allow(dead_code)]

use async_trait::async_trait;
use prompt_arena::error::InvocationError;
use prompt_arena::{CanonicalRequest, ProviderAdapter, ProviderKind, WireRequest};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Adapter whose replies are scripted per model id.
///
/// By default a call succeeds with `"<model> <- <user prompt>"`.
#[derive(Debug)]
pub struct FakeAdapter {
    kind: ProviderKind,
    failures: HashMap<String, InvocationError>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    gate: Option<(String, Arc<Semaphore>)>,
    calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            failures: HashMap::new(),
            delays: HashMap::new(),
            panics: HashSet::new(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, model: &str, error: InvocationError) -> Self {
        self.failures.insert(model.to_string(), error);
        self
    }

    pub fn delayed(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub fn panicking(mut self, model: &str) -> Self {
        self.panics.insert(model.to_string());
        self
    }

    /// Hold every call whose user prompt equals `prompt` until the semaphore
    /// receives permits.
    pub fn gated_on(mut self, prompt: &str, gate: Arc<Semaphore>) -> Self {
        self.gate = Some((prompt.to_string(), gate));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reply_for(model: &str, prompt: &str) -> String {
        format!("{} <- {}", model, prompt)
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn build_request(&self, request: &CanonicalRequest, model: &str) -> WireRequest {
        WireRequest {
            url: format!("fake://{}", self.kind),
            headers: HashMap::new(),
            body: serde_json::json!({"model": model, "prompt": request.user_prompt}),
        }
    }

    async fn invoke(&self, wire: &WireRequest) -> Result<Value, InvocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = wire.body["model"].as_str().unwrap_or_default().to_string();
        let prompt = wire.body["prompt"].as_str().unwrap_or_default().to_string();

        if let Some((gated_prompt, gate)) = &self.gate {
            if *gated_prompt == prompt {
                let _permit = gate.acquire().await.expect("gate closed");
            }
        }
        if let Some(delay) = self.delays.get(&model) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(&model) {
            panic!("adapter exploded for {}", model);
        }
        if let Some(err) = self.failures.get(&model) {
            return Err(err.clone());
        }
        Ok(serde_json::json!({"text": Self::reply_for(&model, &prompt)}))
    }

    fn extract_text(&self, body: &Value) -> Result<String, InvocationError> {
        body.get("text")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| InvocationError::malformed("missing text"))
    }
}

pub fn adapters(fakes: Vec<Arc<FakeAdapter>>) -> Vec<Arc<dyn ProviderAdapter>> {
    fakes
        .into_iter()
        .map(|a| a as Arc<dyn ProviderAdapter>)
        .collect()
}
