//! Per-model invocation state and the updates that carry it.

use serde::Serialize;

use crate::error::{FailureKind, InvocationError};
use crate::Result;

/// Monotonic stamp identifying one invocation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RoundId(pub(crate) u64);

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// State of one model within one round. Starts `Pending` and moves exactly once
/// to `Succeeded` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationState {
    Pending,
    Succeeded { text: String },
    Failed { kind: FailureKind, message: String },
}

impl InvocationState {
    pub fn succeeded(text: impl Into<String>) -> Self {
        InvocationState::Succeeded { text: text.into() }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InvocationState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationState::Succeeded { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            InvocationState::Succeeded { text } => Some(text),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<(FailureKind, &str)> {
        match self {
            InvocationState::Failed { kind, message } => Some((*kind, message)),
            _ => None,
        }
    }

    /// Text for a result slot; failures render as `Error: <message>`.
    pub fn display_text(&self) -> String {
        match self {
            InvocationState::Pending => "Generating response...".to_string(),
            InvocationState::Succeeded { text } => text.clone(),
            InvocationState::Failed { message, .. } => format!("Error: {}", message),
        }
    }
}

impl From<InvocationError> for InvocationState {
    fn from(e: InvocationError) -> Self {
        InvocationState::Failed {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<std::result::Result<String, InvocationError>> for InvocationState {
    fn from(r: std::result::Result<String, InvocationError>) -> Self {
        match r {
            Ok(text) => InvocationState::Succeeded { text },
            Err(e) => e.into(),
        }
    }
}

/// One emission of a round: the state of `model_id`, stamped with its round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundUpdate {
    pub round: RoundId,
    pub model_id: String,
    pub state: InvocationState,
}

impl RoundUpdate {
    /// Single-line JSON form, e.g.
    /// `{"round":3,"model_id":"gpt-4o","state":{"status":"succeeded","text":"Hi"}}`.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        assert_eq!(InvocationState::succeeded("Hi").display_text(), "Hi");
        let failed: InvocationState = InvocationError::Upstream {
            status: 401,
            message: "Invalid API key".into(),
        }
        .into();
        assert_eq!(failed.display_text(), "Error: Invalid API key");
        assert_eq!(failed.failure().unwrap().0, FailureKind::Upstream);
        assert!(failed.is_terminal());
        assert!(InvocationState::Pending.is_pending());
    }

    #[test]
    fn test_state_serializes_tagged() {
        let v = serde_json::to_value(InvocationState::succeeded("ok")).unwrap();
        assert_eq!(v, serde_json::json!({"status": "succeeded", "text": "ok"}));
    }

    #[test]
    fn test_update_json_line() {
        let update = RoundUpdate {
            round: RoundId(3),
            model_id: "llama3".into(),
            state: InvocationError::transport("connection refused").into(),
        };
        let line = update.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "round": 3,
                "model_id": "llama3",
                "state": {"status": "failed", "kind": "transport", "message": "connection refused"}
            })
        );
    }

    #[test]
    fn test_round_id_ordering() {
        assert!(RoundId(2) > RoundId(1));
        assert_eq!(RoundId(7).to_string(), "round-7");
    }
}
