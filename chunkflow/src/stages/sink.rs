//! Sink stage: bounded queue, serialized async completions, backpressure.

use super::RecordConsumer;
use crate::core::{Chunk, ChunkQueue, StageState, StateCell, Watermarks};
use crate::errors::SinkError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// A sink stage wrapping a [`RecordConsumer`] collaborator.
///
/// Chunks are enqueued by `write` and completed strictly in FIFO submission
/// order: the controller starts the next item's async work only after the
/// previous item's work finished, so side effects are never reordered even
/// when per-item latency varies.
pub struct SinkStage {
    name: String,
    consumer: Box<dyn RecordConsumer>,
    queue: ChunkQueue,
    state: StateCell,
    items_completed: u64,
}

impl SinkStage {
    /// Creates a new sink stage with the given watermarks.
    pub fn new(
        name: impl Into<String>,
        consumer: impl RecordConsumer + 'static,
        watermarks: Watermarks,
    ) -> Self {
        Self {
            name: name.into(),
            consumer: Box::new(consumer),
            queue: ChunkQueue::new(watermarks),
            state: StateCell::new(),
            items_completed: 0,
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

    /// Returns the number of in-flight (queued, unacknowledged) items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns how many items have completed their async work.
    #[must_use]
    pub fn items_completed(&self) -> u64 {
        self.items_completed
    }

    /// Enqueues a chunk for asynchronous processing.
    ///
    /// Returns `false` once the pending count reaches the high-water mark;
    /// the stage enters `Draining` and upstream must pause. The chunk is
    /// still queued - backpressure asks upstream to stop, it never drops.
    pub(crate) fn write(&mut self, chunk: Chunk) -> bool {
        if !self.state.get().is_accepting() {
            warn!(stage = %self.name, state = %self.state.get(), "write on non-accepting sink ignored");
            return false;
        }
        self.state.transition(StageState::Accepting);

        let accepted = self.queue.push(chunk);
        if !accepted {
            self.state.transition(StageState::Draining);
            debug!(stage = %self.name, pending = self.queue.len(), "sink entered draining");
        }
        accepted
    }

    /// Handles `complete()` from upstream: moves to `Ending` so the queue
    /// can drain. Idempotent on terminal stages.
    pub(crate) fn complete(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state.transition(StageState::Ending);
    }

    /// Returns true while queued work remains on a non-terminal stage.
    #[must_use]
    pub(crate) fn has_work(&self) -> bool {
        !self.queue.is_empty() && !self.state.is_terminal()
    }

    /// Completes the oldest queued item's async work.
    ///
    /// Returns the completed chunk. On failure the stage moves to
    /// `Errored` and every remaining queued item is discarded without its
    /// side effects running.
    ///
    /// # Errors
    ///
    /// Propagates the consumer's [`SinkError`].
    pub(crate) async fn drain_one(&mut self) -> Result<Option<Chunk>, SinkError> {
        let Some(chunk) = self.queue.pop() else {
            return Ok(None);
        };

        match self.consumer.process(&chunk).await {
            Ok(()) => {
                self.items_completed += 1;
                Ok(Some(chunk))
            }
            Err(err) => {
                self.state.transition(StageState::Errored);
                let dropped = self.queue.clear();
                if dropped > 0 {
                    warn!(stage = %self.name, dropped, "discarding queued items after sink error");
                }
                Err(SinkError::new(&self.name, err.reason))
            }
        }
    }

    /// Returns true when a resume signal should go upstream: the stage is
    /// `Draining` and pending has dropped to the low-water mark or below.
    #[must_use]
    pub(crate) fn should_resume(&self) -> bool {
        self.state.get() == StageState::Draining && self.queue.at_or_below_low_water()
    }

    /// Leaves `Draining` after the resume signal has been relayed.
    pub(crate) fn resume(&mut self) {
        if self.state.get() == StageState::Draining {
            self.state.transition(StageState::Accepting);
        }
    }

    /// Moves `Ending -> Finished` once the queue is empty.
    ///
    /// Returns true only on the transition itself, so the terminal signal
    /// fires at most once.
    pub(crate) fn finish_if_drained(&mut self) -> bool {
        if self.state.get() == StageState::Ending && self.queue.is_empty() {
            return self.state.transition(StageState::Finished);
        }
        false
    }

    /// Marks the stage errored and discards queued items (chain abort or
    /// cancellation).
    pub(crate) fn abort(&mut self) -> usize {
        self.state.transition(StageState::Errored);
        self.queue.clear()
    }
}

impl std::fmt::Debug for SinkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkStage")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .field("pending", &self.queue.len())
            .field("items_completed", &self.items_completed)
            .finish()
    }
}

/// A consumer that simulates per-item latency proportional to chunk weight.
///
/// Useful as the terminal side of demo and load-shaped pipelines: a record
/// of weight `w` takes `w * latency_per_unit` to complete.
#[derive(Debug)]
pub struct SimulatedConsumer {
    latency_per_unit: Duration,
}

impl SimulatedConsumer {
    /// Creates a consumer sleeping `latency_per_unit` per unit of weight.
    #[must_use]
    pub fn new(latency_per_unit: Duration) -> Self {
        Self { latency_per_unit }
    }
}

#[async_trait]
impl RecordConsumer for SimulatedConsumer {
    async fn process(&mut self, chunk: &Chunk) -> Result<(), SinkError> {
        let delay = self.latency_per_unit * u32::try_from(chunk.weight()).unwrap_or(u32::MAX);
        tokio::time::sleep(delay).await;
        debug!(weight = chunk.weight(), "simulated item completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConsumer;

    fn small_sink(consumer: RecordingConsumer, high: usize, low: usize) -> SinkStage {
        SinkStage::new("store", consumer, Watermarks::new(high, low).unwrap())
    }

    #[tokio::test]
    async fn test_write_signals_pressure_at_high_water() {
        let mut sink = small_sink(RecordingConsumer::new(), 2, 0);

        assert!(sink.write(Chunk::text("a")));
        assert!(!sink.write(Chunk::text("b")));
        assert_eq!(sink.state(), StageState::Draining);
        assert_eq!(sink.pending(), 2);
    }

    #[tokio::test]
    async fn test_drain_preserves_fifo_and_resumes() {
        let mut sink = small_sink(RecordingConsumer::new(), 2, 0);
        sink.write(Chunk::text("a"));
        sink.write(Chunk::text("b"));

        let first = sink.drain_one().await.unwrap().unwrap();
        assert_eq!(first.as_text(), Some("a"));
        assert!(!sink.should_resume());

        sink.drain_one().await.unwrap();
        assert!(sink.should_resume());
        sink.resume();
        assert_eq!(sink.state(), StageState::Accepting);
    }

    #[tokio::test]
    async fn test_complete_then_drain_finishes_once() {
        let mut sink = small_sink(RecordingConsumer::new(), 4, 1);
        sink.write(Chunk::text("a"));
        sink.complete();
        assert_eq!(sink.state(), StageState::Ending);
        assert!(!sink.finish_if_drained());

        sink.drain_one().await.unwrap();
        assert!(sink.finish_if_drained());
        // The terminal transition fires at most once.
        assert!(!sink.finish_if_drained());
        assert_eq!(sink.state(), StageState::Finished);
    }

    #[tokio::test]
    async fn test_complete_on_terminal_stage_is_noop() {
        let mut sink = small_sink(RecordingConsumer::new(), 4, 1);
        sink.complete();
        assert!(sink.finish_if_drained());

        sink.complete();
        assert_eq!(sink.state(), StageState::Finished);
    }

    #[tokio::test]
    async fn test_item_failure_discards_remaining_queue() {
        let consumer = RecordingConsumer::new().failing_on("b");
        let log = consumer.log_handle();
        let mut sink = small_sink(consumer, 8, 2);

        for text in ["a", "b", "c", "d"] {
            sink.write(Chunk::text(text));
        }

        sink.drain_one().await.unwrap();
        let err = sink.drain_one().await.unwrap_err();
        assert_eq!(err.stage, "store");

        assert_eq!(sink.state(), StageState::Errored);
        assert_eq!(sink.pending(), 0);
        // Only the first item's side effect ran.
        assert_eq!(*log.lock(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_write_after_terminal_is_rejected() {
        let mut sink = small_sink(RecordingConsumer::new(), 4, 1);
        sink.abort();
        assert!(!sink.write(Chunk::text("late")));
        assert_eq!(sink.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_consumer_latency_scales_with_weight() {
        let mut consumer = SimulatedConsumer::new(Duration::from_millis(10));

        let start = tokio::time::Instant::now();
        consumer.process(&Chunk::text("abc")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(30));
    }
}
