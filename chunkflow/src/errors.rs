//! Error taxonomy for pipeline stages and the controller.
//!
//! Any stage error aborts the enclosing pipeline; retries are the
//! orchestrator's responsibility.

use thiserror::Error;

/// Error raised when a source fails to produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("source '{stage}' failed: {reason}")]
pub struct SourceError {
    /// The failing stage name.
    pub stage: String,
    /// Human-readable failure reason.
    pub reason: String,
}

impl SourceError {
    /// Creates a new source error.
    #[must_use]
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a transform receives malformed or unreassemblable input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transform '{stage}' failed: {reason}")]
pub struct TransformError {
    /// The failing stage name.
    pub stage: String,
    /// Human-readable failure reason.
    pub reason: String,
}

impl TransformError {
    /// Creates a new transform error.
    #[must_use]
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a sink's per-item processing fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sink '{stage}' failed: {reason}")]
pub struct SinkError {
    /// The failing stage name.
    pub stage: String,
    /// Human-readable failure reason.
    pub reason: String,
}

impl SinkError {
    /// Creates a new sink error.
    #[must_use]
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a pipeline is assembled from an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Watermark thresholds out of range.
    #[error("invalid watermarks: high ({high}) must be >= 1 and low ({low}) must be < high")]
    InvalidWatermarks {
        /// Requested pause threshold.
        high: usize,
        /// Requested resume threshold.
        low: usize,
    },

    /// The builder was finalized without a source stage.
    #[error("pipeline '{pipeline}' has no source stage")]
    MissingSource {
        /// The pipeline name.
        pipeline: String,
    },

    /// The builder was finalized without a sink stage.
    #[error("pipeline '{pipeline}' has no sink stage")]
    MissingSink {
        /// The pipeline name.
        pipeline: String,
    },
}

/// The aggregated error type surfaced by a pipeline's terminal signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A source stage failed to produce.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// A transform stage rejected its input.
    #[error("{0}")]
    Transform(#[from] TransformError),

    /// A sink's per-item work failed.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// The pipeline was cancelled by an external request.
    #[error("pipeline cancelled: {0}")]
    Cancelled(String),

    /// The pipeline could not be assembled.
    #[error("{0}")]
    Build(#[from] BuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = TransformError::new("lines", "record is not valid utf-8");
        assert_eq!(
            err.to_string(),
            "transform 'lines' failed: record is not valid utf-8"
        );
    }

    #[test]
    fn test_pipeline_error_from_stage_errors() {
        let err: PipelineError = SinkError::new("store", "disk full").into();
        assert!(matches!(err, PipelineError::Sink(_)));
        assert_eq!(err.to_string(), "sink 'store' failed: disk full");
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::InvalidWatermarks { high: 0, low: 0 };
        assert!(err.to_string().contains("high (0)"));

        let err = BuildError::MissingSource {
            pipeline: "p".to_string(),
        };
        assert!(err.to_string().contains("no source stage"));
    }

    #[test]
    fn test_cancelled_display() {
        let err = PipelineError::Cancelled("shutdown".to_string());
        assert_eq!(err.to_string(), "pipeline cancelled: shutdown");
    }
}
