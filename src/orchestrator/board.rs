//! Consumer-side state map for the current round.

use std::collections::HashMap;
use tracing::debug;

use super::state::{InvocationState, RoundId, RoundUpdate};
use super::RoundHandle;

/// Per-model state of the round the caller is currently showing.
///
/// Starting a round discards everything from the previous one. Updates stamped
/// with any other round are rejected, as are repeats for a model that already
/// settled, so a late reply from an abandoned round cannot overwrite the current
/// round's results.
#[derive(Debug, Clone, Default)]
pub struct RoundBoard {
    round: Option<RoundId>,
    order: Vec<String>,
    states: HashMap<String, InvocationState>,
}

impl RoundBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle`'s round current, with every selected model `Pending`.
    pub fn begin(&mut self, handle: &RoundHandle) {
        self.begin_round(handle.round(), handle.model_ids());
    }

    pub fn begin_round(&mut self, round: RoundId, model_ids: &[String]) {
        if let Some(previous) = self.round {
            debug!(%previous, current = %round, "superseding round");
        }
        self.round = Some(round);
        self.order = model_ids.to_vec();
        self.states = model_ids
            .iter()
            .map(|id| (id.clone(), InvocationState::Pending))
            .collect();
    }

    /// Record a terminal update. Returns `false` if it was ignored.
    pub fn apply(&mut self, update: RoundUpdate) -> bool {
        if self.round != Some(update.round) {
            debug!(stale = %update.round, model = %update.model_id, "discarding update from superseded round");
            return false;
        }
        if update.state.is_pending() {
            return false;
        }
        match self.states.get_mut(&update.model_id) {
            Some(slot) if slot.is_pending() => {
                *slot = update.state;
                true
            }
            Some(_) => false,
            None => {
                debug!(model = %update.model_id, "discarding update for unselected model");
                false
            }
        }
    }

    pub fn round(&self) -> Option<RoundId> {
        self.round
    }

    pub fn state(&self, model_id: &str) -> Option<&InvocationState> {
        self.states.get(model_id)
    }

    /// `(model_id, state)` in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InvocationState)> {
        self.order
            .iter()
            .filter_map(move |id| self.states.get(id).map(|s| (id.as_str(), s)))
    }

    pub fn pending_count(&self) -> usize {
        self.states.values().filter(|s| s.is_pending()).count()
    }

    /// No model of the current round is still pending.
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }

    /// Forget the current round entirely.
    pub fn clear(&mut self) {
        self.round = None;
        self.order.clear();
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn update(round: u64, model: &str, state: InvocationState) -> RoundUpdate {
        RoundUpdate {
            round: RoundId(round),
            model_id: model.to_string(),
            state,
        }
    }

    #[test]
    fn test_begin_resets_to_pending() {
        let mut board = RoundBoard::new();
        board.begin_round(RoundId(1), &ids(&["a", "b"]));
        assert_eq!(board.pending_count(), 2);
        assert!(!board.is_settled());
        assert!(board.apply(update(1, "a", InvocationState::succeeded("x"))));

        board.begin_round(RoundId(2), &ids(&["b"]));
        assert_eq!(board.len(), 1);
        assert!(board.state("a").is_none());
        assert!(board.state("b").unwrap().is_pending());
    }

    #[test]
    fn test_stale_round_rejected() {
        let mut board = RoundBoard::new();
        board.begin_round(RoundId(1), &ids(&["a"]));
        board.begin_round(RoundId(2), &ids(&["a"]));
        assert!(!board.apply(update(1, "a", InvocationState::succeeded("old"))));
        assert!(board.state("a").unwrap().is_pending());
        assert!(board.apply(update(2, "a", InvocationState::succeeded("new"))));
        assert_eq!(board.state("a").unwrap().text(), Some("new"));
    }

    #[test]
    fn test_terminal_transition_happens_once() {
        let mut board = RoundBoard::new();
        board.begin_round(RoundId(3), &ids(&["a"]));
        assert!(!board.apply(update(3, "a", InvocationState::Pending)));
        assert!(board.apply(update(3, "a", InvocationState::succeeded("first"))));
        assert!(!board.apply(update(3, "a", InvocationState::succeeded("second"))));
        assert_eq!(board.state("a").unwrap().text(), Some("first"));
        assert!(board.is_settled());
    }

    #[test]
    fn test_unselected_model_ignored_and_iter_order() {
        let mut board = RoundBoard::new();
        board.begin_round(RoundId(1), &ids(&["z", "a"]));
        assert!(!board.apply(update(1, "q", InvocationState::succeeded("x"))));
        let order: Vec<_> = board.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["z", "a"]);
    }

    #[test]
    fn test_clear() {
        let mut board = RoundBoard::new();
        board.begin_round(RoundId(1), &ids(&["a"]));
        board.clear();
        assert!(board.is_empty());
        assert_eq!(board.round(), None);
        assert!(board.is_settled());
        assert!(!board.apply(update(1, "a", InvocationState::succeeded("x"))));
    }
}
