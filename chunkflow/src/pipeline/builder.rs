//! Fluent assembly of stage chains.

use super::completion::Completion;
use super::{CompletionHandle, Pipeline};
use crate::cancellation::CancelToken;
use crate::core::Watermarks;
use crate::errors::BuildError;
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::{ChunkProducer, RecordConsumer, RecordTransform, SinkStage, SourceStage, TransformStage};
use std::sync::Arc;

/// Builder wiring a source, any number of transforms, and a sink into a
/// pipeline.
///
/// Chaining `transform` calls builds arbitrary-length chains; each stage
/// pair is connected by a [`PipeLink`](super::PipeLink) owned by the
/// controller.
pub struct PipelineBuilder {
    name: String,
    source: Option<SourceStage>,
    transforms: Vec<TransformStage>,
    sink: Option<SinkStage>,
    watermarks: Watermarks,
    events: Arc<dyn EventSink>,
    cancel: CancelToken,
}

impl PipelineBuilder {
    /// Creates a builder for a pipeline with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            transforms: Vec::new(),
            sink: None,
            watermarks: Watermarks::default(),
            events: Arc::new(NoOpEventSink),
            cancel: CancelToken::new(),
        }
    }

    /// Sets the watermarks used by the sink. Call before [`Self::sink`].
    #[must_use]
    pub fn watermarks(mut self, watermarks: Watermarks) -> Self {
        self.watermarks = watermarks;
        self
    }

    /// Sets the event sink observing the run.
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Supplies the cancellation token; defaults to a fresh token.
    #[must_use]
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the source stage.
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, producer: impl ChunkProducer + 'static) -> Self {
        self.source = Some(SourceStage::new(name, producer));
        self
    }

    /// Appends a transform stage to the chain.
    #[must_use]
    pub fn transform(mut self, name: impl Into<String>, logic: impl RecordTransform + 'static) -> Self {
        self.transforms.push(TransformStage::new(name, logic));
        self
    }

    /// Sets the sink stage, using the currently configured watermarks.
    #[must_use]
    pub fn sink(mut self, name: impl Into<String>, consumer: impl RecordConsumer + 'static) -> Self {
        self.sink = Some(SinkStage::new(name, consumer, self.watermarks));
        self
    }

    /// Assembles the pipeline and its terminal-signal handle.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the chain is missing a source or a sink.
    pub fn build(self) -> Result<(Pipeline, CompletionHandle), BuildError> {
        let source = self.source.ok_or_else(|| BuildError::MissingSource {
            pipeline: self.name.clone(),
        })?;
        let sink = self.sink.ok_or_else(|| BuildError::MissingSink {
            pipeline: self.name.clone(),
        })?;

        let (completion, handle) = Completion::channel();
        let pipeline = Pipeline::assemble(
            self.name,
            source,
            self.transforms,
            sink,
            self.events,
            completion,
            self.cancel,
        );
        Ok((pipeline, handle))
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("has_source", &self.source.is_some())
            .field("transforms", &self.transforms.len())
            .field("has_sink", &self.sink.is_some())
            .field("watermarks", &self.watermarks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::LineSplitter;
    use crate::testing::{RecordingConsumer, ScriptedProducer};

    #[test]
    fn test_build_requires_source() {
        let err = PipelineBuilder::new("p")
            .sink("store", RecordingConsumer::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingSource { .. }));
    }

    #[test]
    fn test_build_requires_sink() {
        let err = PipelineBuilder::new("p")
            .source("src", ScriptedProducer::from_texts(&["a"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingSink { .. }));
    }

    #[test]
    fn test_build_wires_links_in_order() {
        let (pipeline, _handle) = PipelineBuilder::new("p")
            .source("src", ScriptedProducer::from_texts(&["a"]))
            .transform("lines", LineSplitter::lines())
            .sink("store", RecordingConsumer::new())
            .build()
            .unwrap();

        let links = pipeline.links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].upstream, "src");
        assert_eq!(links[0].downstream, "lines");
        assert_eq!(links[1].upstream, "lines");
        assert_eq!(links[1].downstream, "store");
        assert!(!links[0].is_paused());
    }
}
