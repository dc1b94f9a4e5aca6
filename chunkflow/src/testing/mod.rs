//! Test doubles for pipeline collaborators.
//!
//! These are ordinary implementations of the collaborator traits, kept in
//! the library so downstream crates can reuse them in their own tests.

use crate::core::Chunk;
use crate::errors::{SinkError, SourceError};
use crate::stages::{ChunkProducer, RecordConsumer};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// A producer that yields a scripted sequence of chunks, then end of input.
#[derive(Debug)]
pub struct ScriptedProducer {
    chunks: VecDeque<Chunk>,
    fail_after: Option<usize>,
    produced: usize,
}

impl ScriptedProducer {
    /// Creates a producer over the given chunks.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: chunks.into(),
            fail_after: None,
            produced: 0,
        }
    }

    /// Creates a producer over byte chunks built from the given texts.
    #[must_use]
    pub fn from_texts(texts: &[&str]) -> Self {
        Self::from_chunks(texts.iter().map(Chunk::text).collect())
    }

    /// Creates a producer that ends immediately.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_chunks(Vec::new())
    }

    /// Makes the producer fail after yielding `count` chunks.
    #[must_use]
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

#[async_trait]
impl ChunkProducer for ScriptedProducer {
    async fn next(&mut self) -> Result<Option<Chunk>, SourceError> {
        if self.fail_after == Some(self.produced) {
            return Err(SourceError::new("scripted", "scripted production failure"));
        }
        self.produced += 1;
        Ok(self.chunks.pop_front())
    }
}

/// A consumer that records each processed record's text.
///
/// Optional per-unit latency simulates slow item processing; an optional
/// failure trigger errors the sink when a matching record arrives.
#[derive(Debug)]
pub struct RecordingConsumer {
    log: Arc<Mutex<Vec<String>>>,
    latency_per_unit: Duration,
    fail_on: Option<String>,
}

impl RecordingConsumer {
    /// Creates a zero-latency recording consumer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            latency_per_unit: Duration::ZERO,
            fail_on: None,
        }
    }

    /// Sleeps `latency` per unit of chunk weight before recording.
    #[must_use]
    pub fn with_latency_per_unit(mut self, latency: Duration) -> Self {
        self.latency_per_unit = latency;
        self
    }

    /// Fails the item whose record text equals `text`.
    #[must_use]
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on = Some(text.into());
        self
    }

    /// Returns a handle to the completion log, usable after the consumer
    /// has been moved into a sink.
    #[must_use]
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }
}

impl Default for RecordingConsumer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordConsumer for RecordingConsumer {
    async fn process(&mut self, chunk: &Chunk) -> Result<(), SinkError> {
        if !self.latency_per_unit.is_zero() {
            let delay = self.latency_per_unit * u32::try_from(chunk.weight()).unwrap_or(u32::MAX);
            tokio::time::sleep(delay).await;
        }

        let text = chunk.as_text().unwrap_or_default().to_string();
        if self.fail_on.as_deref() == Some(text.as_str()) {
            return Err(SinkError::new("recording", format!("rejected record '{text}'")));
        }
        self.log.lock().push(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_producer_yields_then_ends() {
        let mut producer = ScriptedProducer::from_texts(&["a", "b"]);
        assert_eq!(producer.next().await.unwrap().unwrap().as_text(), Some("a"));
        assert_eq!(producer.next().await.unwrap().unwrap().as_text(), Some("b"));
        assert!(producer.next().await.unwrap().is_none());
        // End of input is stable.
        assert!(producer.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scripted_producer_failure() {
        let mut producer = ScriptedProducer::from_texts(&["a"]).failing_after(0);
        assert!(producer.next().await.is_err());
    }

    #[tokio::test]
    async fn test_recording_consumer_logs_in_order() {
        let mut consumer = RecordingConsumer::new();
        let log = consumer.log_handle();

        consumer.process(&Chunk::text("x")).await.unwrap();
        consumer.process(&Chunk::text("y")).await.unwrap();

        assert_eq!(*log.lock(), vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn test_recording_consumer_failure_trigger() {
        let mut consumer = RecordingConsumer::new().failing_on("bad");
        consumer.process(&Chunk::text("ok")).await.unwrap();
        let err = consumer.process(&Chunk::text("bad")).await.unwrap_err();
        assert!(err.reason.contains("bad"));
    }
}
