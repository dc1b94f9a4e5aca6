//! Pipeline event type for emitting flow-control and lifecycle events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted while a pipeline runs.
///
/// Every emission attempt, pause/resume signal, flush, and terminal
/// transition is observable through these events, which is what the test
/// suite asserts flow-control behavior against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeEvent {
    /// The event type (e.g., "source.emit", "link.paused").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipeEvent {
    /// Creates a new event with the given type.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Creates a "source.emit" event for an emission attempt.
    #[must_use]
    pub fn emit(stage: &str, accepted: bool) -> Self {
        Self::new("source.emit")
            .add_data("stage", serde_json::json!(stage))
            .add_data("accepted", serde_json::json!(accepted))
    }

    /// Creates a "link.paused" event when downstream signals pressure.
    #[must_use]
    pub fn paused(upstream: &str, downstream: &str) -> Self {
        Self::new("link.paused")
            .add_data("upstream", serde_json::json!(upstream))
            .add_data("downstream", serde_json::json!(downstream))
    }

    /// Creates a "link.resumed" event when downstream drains below its
    /// low-water mark.
    #[must_use]
    pub fn resumed(upstream: &str, downstream: &str) -> Self {
        Self::new("link.resumed")
            .add_data("upstream", serde_json::json!(upstream))
            .add_data("downstream", serde_json::json!(downstream))
    }

    /// Creates a "transform.record" event for a derived record.
    #[must_use]
    pub fn record(stage: &str, weight: u64) -> Self {
        Self::new("transform.record")
            .add_data("stage", serde_json::json!(stage))
            .add_data("weight", serde_json::json!(weight))
    }

    /// Creates a "transform.flush" event.
    #[must_use]
    pub fn flushed(stage: &str) -> Self {
        Self::new("transform.flush").add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "sink.item_completed" event for one finished work item.
    #[must_use]
    pub fn item_completed(stage: &str, weight: u64) -> Self {
        Self::new("sink.item_completed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("weight", serde_json::json!(weight))
    }

    /// Creates a "stage.completed" event when `complete()` is relayed.
    #[must_use]
    pub fn completed(stage: &str) -> Self {
        Self::new("stage.completed").add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "pipeline.finished" terminal event.
    #[must_use]
    pub fn finished(pipeline: &str) -> Self {
        Self::new("pipeline.finished").add_data("pipeline", serde_json::json!(pipeline))
    }

    /// Creates a "pipeline.errored" terminal event.
    #[must_use]
    pub fn errored(pipeline: &str, error: &str) -> Self {
        Self::new("pipeline.errored")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "pipeline.cancelled" terminal event.
    #[must_use]
    pub fn cancelled(pipeline: &str, reason: &str) -> Self {
        Self::new("pipeline.cancelled")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("reason", serde_json::json!(reason))
    }
}
