//! The pipe controller: wires stages together and drives the chain.

use super::completion::Completion;
use crate::cancellation::CancelToken;
use crate::core::Chunk;
use crate::errors::PipelineError;
use crate::events::{EventSink, PipeEvent};
use crate::stages::{SinkStage, SourceStage, TransformStage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A directed link between two adjacent stages.
///
/// The controller is the sole mutator of the paused flag; stages never
/// touch each other's flow-control state.
#[derive(Debug, Clone)]
pub struct PipeLink {
    /// Name of the upstream stage.
    pub upstream: String,
    /// Name of the downstream stage.
    pub downstream: String,
    paused: bool,
}

impl PipeLink {
    fn new(upstream: impl Into<String>, downstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            downstream: downstream.into(),
            paused: false,
        }
    }

    /// Returns true while the link relays a pause signal.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Final accounting for a pipeline run that reached `Finished`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// The pipeline name.
    pub pipeline: String,
    /// The run's unique identity.
    pub run_id: String,
    /// Chunks produced by the source.
    pub chunks_produced: u64,
    /// Records delivered into the sink.
    pub records_delivered: u64,
    /// Items whose async work completed.
    pub items_completed: u64,
}

/// A fully wired pipeline: one source, zero or more transforms, one sink.
///
/// Data flows source -> transforms -> sink; control (pause/resume,
/// completion, errors) flows back through the links. The whole chain runs
/// as one cooperative task: stage steps are synchronous, and the only
/// suspension points are the sink's per-item async work and the producer's
/// pulls.
pub struct Pipeline {
    name: String,
    run_id: Uuid,
    source: SourceStage,
    transforms: Vec<TransformStage>,
    sink: SinkStage,
    links: Vec<PipeLink>,
    events: Arc<dyn EventSink>,
    completion: Completion,
    cancel: CancelToken,
    chain_completed: bool,
    records_delivered: u64,
}

impl Pipeline {
    pub(crate) fn assemble(
        name: String,
        source: SourceStage,
        transforms: Vec<TransformStage>,
        sink: SinkStage,
        events: Arc<dyn EventSink>,
        completion: Completion,
        cancel: CancelToken,
    ) -> Self {
        let mut stage_names = Vec::with_capacity(transforms.len() + 2);
        stage_names.push(source.name().to_string());
        stage_names.extend(transforms.iter().map(|t| t.name().to_string()));
        stage_names.push(sink.name().to_string());

        let links = stage_names
            .windows(2)
            .map(|pair| PipeLink::new(pair[0].clone(), pair[1].clone()))
            .collect();

        Self {
            name,
            run_id: crate::utils::generate_uuid(),
            source,
            transforms,
            sink,
            links,
            events,
            completion,
            cancel,
            chain_completed: false,
            records_delivered: 0,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns this run's unique identity.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns a token that cancels this pipeline when triggered.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns the links between adjacent stages.
    #[must_use]
    pub fn links(&self) -> &[PipeLink] {
        &self.links
    }

    /// Drives the pipeline to a terminal state.
    ///
    /// Resolves the terminal signal exactly once - success after every
    /// stage finished, or the first error encountered. Cancellation behaves
    /// like an injected error: production and writes stop, the in-flight
    /// sink item is abandoned, and queued items are discarded.
    ///
    /// # Errors
    ///
    /// Returns the same result the [`CompletionHandle`](super::CompletionHandle)
    /// observes.
    pub async fn run(mut self) -> Result<PipelineReport, PipelineError> {
        info!(pipeline = %self.name, run_id = %self.run_id, "pipeline started");
        let outcome = self.drive().await;

        match &outcome {
            Ok(()) => {
                info!(pipeline = %self.name, run_id = %self.run_id, "pipeline finished");
                self.events.record(PipeEvent::finished(&self.name));
            }
            Err(PipelineError::Cancelled(reason)) => {
                warn!(pipeline = %self.name, %reason, "pipeline cancelled");
                self.events.record(PipeEvent::cancelled(&self.name, reason));
                self.abort_stages();
            }
            Err(err) => {
                warn!(pipeline = %self.name, error = %err, "pipeline errored");
                self.events.record(PipeEvent::errored(&self.name, &err.to_string()));
                self.abort_stages();
            }
        }

        self.completion.resolve(outcome.clone());

        outcome.map(|()| PipelineReport {
            pipeline: self.name.clone(),
            run_id: self.run_id.to_string(),
            chunks_produced: self.source.chunks_emitted(),
            records_delivered: self.records_delivered,
            items_completed: self.sink.items_completed(),
        })
    }

    async fn drive(&mut self) -> Result<(), PipelineError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled_error());
            }

            // Produce while there is input and no link relays pressure.
            if !self.paused() && !self.source.is_finished() && !self.chain_completed {
                let produced = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(self.cancelled_error()),
                    res = self.source.produce() => res?,
                };
                match produced {
                    Some(chunk) => self.feed(chunk)?,
                    None => self.complete_chain()?,
                }
                continue;
            }

            // Serialized drain: the next item's async work starts only
            // after the previous item finished, so completion order always
            // equals submission order. Cancellation abandons the item
            // mid-flight; its side effects never surface.
            if self.sink.has_work() {
                let completed = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(self.cancelled_error()),
                    res = self.sink.drain_one() => res?,
                };
                if let Some(chunk) = completed {
                    self.events
                        .record(PipeEvent::item_completed(self.sink.name(), chunk.weight()));
                }
                if self.sink.should_resume() {
                    self.sink.resume();
                    self.resume_links();
                }
                continue;
            }

            if self.sink.finish_if_drained() {
                return Ok(());
            }

            // Remaining possibility: a stale pause with an empty queue.
            // Clear it and take another turn.
            self.sink.resume();
            self.resume_links();
        }
    }

    /// Relays one source chunk through the transform chain into the sink.
    fn feed(&mut self, chunk: Chunk) -> Result<(), PipelineError> {
        let mut batch = vec![chunk];
        for transform in &mut self.transforms {
            let mut derived = Vec::new();
            for inbound in batch {
                let records = transform.write(&inbound)?;
                for record in &records {
                    self.events
                        .record(PipeEvent::record(transform.name(), record.weight()));
                }
                derived.extend(records);
            }
            batch = derived;
        }

        let mut accepted = true;
        for record in batch {
            self.records_delivered += 1;
            accepted = self.sink.write(record) && accepted;
        }
        self.events
            .record(PipeEvent::emit(self.source.name(), accepted));

        if !accepted && !self.paused() {
            self.pause_links();
        }
        Ok(())
    }

    /// Relays `complete()` down the chain: each transform flushes exactly
    /// once, trailing records are delivered, and the sink enters `Ending`.
    fn complete_chain(&mut self) -> Result<(), PipelineError> {
        self.events.record(PipeEvent::completed(self.source.name()));

        let mut batch: Vec<Chunk> = Vec::new();
        for i in 0..self.transforms.len() {
            let incoming = std::mem::take(&mut batch);
            for inbound in incoming {
                let records = self.transforms[i].write(&inbound)?;
                for record in &records {
                    self.events
                        .record(PipeEvent::record(self.transforms[i].name(), record.weight()));
                }
                batch.extend(records);
            }

            let trailing = self.transforms[i].complete()?;
            self.events
                .record(PipeEvent::flushed(self.transforms[i].name()));
            self.events
                .record(PipeEvent::completed(self.transforms[i].name()));
            if let Some(record) = trailing {
                batch.push(record);
            }
        }

        for record in batch {
            self.records_delivered += 1;
            // Final records; the queue drains on the next turns, so the
            // accepted flag no longer steers production.
            let _ = self.sink.write(record);
        }
        self.sink.complete();
        self.events.record(PipeEvent::completed(self.sink.name()));
        self.chain_completed = true;
        debug!(pipeline = %self.name, "complete() relayed through the chain");
        Ok(())
    }

    fn paused(&self) -> bool {
        self.links.iter().any(PipeLink::is_paused)
    }

    fn pause_links(&mut self) {
        for link in &mut self.links {
            link.paused = true;
        }
        // The pause relays through the whole chain, so every link reports.
        for link in &self.links {
            self.events
                .record(PipeEvent::paused(&link.upstream, &link.downstream));
        }
    }

    fn resume_links(&mut self) {
        let was_paused = self.paused();
        for link in &mut self.links {
            link.paused = false;
        }
        if was_paused {
            for link in &self.links {
                self.events
                    .record(PipeEvent::resumed(&link.upstream, &link.downstream));
            }
        }
    }

    fn cancelled_error(&self) -> PipelineError {
        PipelineError::Cancelled(
            self.cancel
                .reason()
                .unwrap_or_else(|| "cancelled".to_string()),
        )
    }

    fn abort_stages(&mut self) {
        self.source.abort();
        for transform in &mut self.transforms {
            transform.abort();
        }
        let dropped = self.sink.abort();
        if dropped > 0 {
            debug!(pipeline = %self.name, dropped, "queued sink items discarded");
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .field("transforms", &self.transforms.len())
            .field("chain_completed", &self.chain_completed)
            .finish()
    }
}
