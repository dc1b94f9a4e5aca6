//! Source stage: produces chunks on demand, respects downstream pressure.

use super::ChunkProducer;
use crate::core::{Chunk, StageState, StateCell};
use crate::errors::SourceError;
use tracing::debug;

/// A source stage wrapping a [`ChunkProducer`] collaborator.
///
/// The stage exposes the producer's pull contract as a push model: the pipe
/// controller polls [`SourceStage::produce`] and relays each chunk into the
/// downstream link. The controller never polls while the link is paused,
/// which is what makes the pause contract enforced rather than advisory -
/// a producer has no way to emit past a pause.
pub struct SourceStage {
    name: String,
    producer: Box<dyn ChunkProducer>,
    state: StateCell,
    chunks_emitted: u64,
}

impl SourceStage {
    /// Creates a new source stage.
    pub fn new(name: impl Into<String>, producer: impl ChunkProducer + 'static) -> Self {
        Self {
            name: name.into(),
            producer: Box::new(producer),
            state: StateCell::new(),
            chunks_emitted: 0,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state.get()
    }

    /// Returns how many chunks this source has emitted.
    #[must_use]
    pub fn chunks_emitted(&self) -> u64 {
        self.chunks_emitted
    }

    /// Returns true once the producer reported end of input.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.get() == StageState::Finished
    }

    /// Pulls the next chunk from the producer.
    ///
    /// Returns `None` exactly once, at end of input, after which the stage
    /// is `Finished` and must not be polled again.
    ///
    /// # Errors
    ///
    /// Propagates the producer's [`SourceError`]; the stage moves to
    /// `Errored`.
    pub(crate) async fn produce(&mut self) -> Result<Option<Chunk>, SourceError> {
        debug_assert!(!self.state.is_terminal(), "source polled after terminal state");
        self.state.transition(StageState::Accepting);

        match self.producer.next().await {
            Ok(Some(chunk)) => {
                self.chunks_emitted += 1;
                debug!(stage = %self.name, emitted = self.chunks_emitted, "source produced chunk");
                Ok(Some(chunk))
            }
            Ok(None) => {
                self.state.transition(StageState::Ending);
                self.state.transition(StageState::Finished);
                debug!(stage = %self.name, "source reached end of input");
                Ok(None)
            }
            Err(err) => {
                self.state.transition(StageState::Errored);
                // Surface the enclosing stage's name, not the producer's.
                Err(SourceError::new(&self.name, err.reason))
            }
        }
    }

    /// Marks the stage errored without polling the producer (used when a
    /// downstream failure aborts the chain).
    pub(crate) fn abort(&mut self) {
        self.state.transition(StageState::Errored);
    }
}

impl std::fmt::Debug for SourceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStage")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .field("chunks_emitted", &self.chunks_emitted)
            .finish()
    }
}
