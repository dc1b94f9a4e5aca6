//! One-shot terminal completion signal for a pipeline.

use crate::errors::PipelineError;
use tokio::sync::oneshot;

/// The resolving side of the terminal signal, owned by the pipe controller.
///
/// The one-shot channel makes the "fires exactly once" contract structural:
/// resolving consumes the sender, so a second resolution has nothing to
/// send on.
pub(crate) struct Completion {
    tx: Option<oneshot::Sender<Result<(), PipelineError>>>,
}

impl Completion {
    /// Creates a completion and its observer handle.
    pub(crate) fn channel() -> (Self, CompletionHandle) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, CompletionHandle { rx })
    }

    /// Resolves the terminal signal.
    ///
    /// Returns `false` if the signal already fired; the result is then
    /// dropped rather than surfaced twice.
    pub(crate) fn resolve(&mut self, result: Result<(), PipelineError>) -> bool {
        match self.tx.take() {
            Some(tx) => {
                // The observer may have gone away; that is not an error.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }
}

/// The observing side of a pipeline's aggregated terminal signal.
///
/// Resolved exactly once, with success or the first error encountered,
/// after every stage has reached a terminal state.
#[derive(Debug)]
pub struct CompletionHandle {
    rx: oneshot::Receiver<Result<(), PipelineError>>,
}

impl CompletionHandle {
    /// Waits for the pipeline's terminal signal.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, the cancellation error, or a
    /// cancellation if the pipeline was dropped before running to a
    /// terminal state.
    pub async fn wait(self) -> Result<(), PipelineError> {
        self.rx.await.unwrap_or_else(|_| {
            Err(PipelineError::Cancelled(
                "pipeline dropped before reaching a terminal state".to_string(),
            ))
        })
    }
}
