//! Stage lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a pipeline stage.
///
/// Stages move through `Idle -> Accepting -> Draining -> Ending` and settle
/// in exactly one of the terminal states. Terminal states are irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Stage created, no chunk seen yet.
    Idle,
    /// Stage is accepting chunks.
    Accepting,
    /// Backpressure active; upstream has been asked to pause.
    Draining,
    /// `complete()` received, queued work still draining.
    Ending,
    /// All work drained, terminal success.
    Finished,
    /// A stage error occurred, terminal failure.
    Errored,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Accepting => write!(f, "accepting"),
            Self::Draining => write!(f, "draining"),
            Self::Ending => write!(f, "ending"),
            Self::Finished => write!(f, "finished"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

impl StageState {
    /// Returns true if the state is terminal (`Finished` or `Errored`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Errored)
    }

    /// Returns true if the stage can still accept input.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        matches!(self, Self::Idle | Self::Accepting | Self::Draining)
    }
}

/// A state holder that enforces terminal-state irreversibility.
///
/// A terminal state is reached at most once; every transition attempted
/// after that is a no-op.
#[derive(Debug, Default)]
pub struct StateCell {
    state: StageState,
}

impl StateCell {
    /// Creates a new cell in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> StageState {
        self.state
    }

    /// Attempts a transition.
    ///
    /// Returns `false` (leaving the state untouched) if the cell is already
    /// terminal, or if the transition is a self-transition.
    pub fn transition(&mut self, next: StageState) -> bool {
        if self.state.is_terminal() || self.state == next {
            return false;
        }
        self.state = next;
        true
    }

    /// Returns true if the cell holds a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(StageState::Idle.to_string(), "idle");
        assert_eq!(StageState::Draining.to_string(), "draining");
        assert_eq!(StageState::Errored.to_string(), "errored");
    }

    #[test]
    fn test_terminal_states() {
        assert!(StageState::Finished.is_terminal());
        assert!(StageState::Errored.is_terminal());
        assert!(!StageState::Ending.is_terminal());
        assert!(!StageState::Idle.is_terminal());
    }

    #[test]
    fn test_accepting_states() {
        assert!(StageState::Idle.is_accepting());
        assert!(StageState::Accepting.is_accepting());
        assert!(StageState::Draining.is_accepting());
        assert!(!StageState::Ending.is_accepting());
        assert!(!StageState::Finished.is_accepting());
    }

    #[test]
    fn test_cell_transitions() {
        let mut cell = StateCell::new();
        assert_eq!(cell.get(), StageState::Idle);

        assert!(cell.transition(StageState::Accepting));
        assert!(cell.transition(StageState::Ending));
        assert!(cell.transition(StageState::Finished));
        assert_eq!(cell.get(), StageState::Finished);
    }

    #[test]
    fn test_cell_terminal_is_irreversible() {
        let mut cell = StateCell::new();
        cell.transition(StageState::Errored);

        // Terminal is reached at most once; later transitions are no-ops.
        assert!(!cell.transition(StageState::Finished));
        assert!(!cell.transition(StageState::Accepting));
        assert_eq!(cell.get(), StageState::Errored);
    }

    #[test]
    fn test_cell_self_transition_is_noop() {
        let mut cell = StateCell::new();
        cell.transition(StageState::Accepting);
        assert!(!cell.transition(StageState::Accepting));
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_string(&StageState::Draining).unwrap();
        assert_eq!(json, r#""draining""#);
        let back: StageState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StageState::Draining);
    }
}
