//! # Chunkflow
//!
//! A composable stream processing pipeline with explicit flow control.
//!
//! Chunkflow wires a source, a chain of transforms, and a sink into a
//! single cooperative pipeline with:
//!
//! - **Backpressure**: bounded per-boundary queues with high/low
//!   watermarks; downstream pressure pauses the source until the queue
//!   drains.
//! - **Chunk reassembly**: transforms carry partial records across chunk
//!   boundaries and flush the trailing state exactly once at end of input.
//! - **Ordered async completion**: sink items complete strictly in
//!   submission order, regardless of per-item latency.
//! - **One-shot terminal signal**: every pipeline resolves exactly once,
//!   with success or the first error encountered.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chunkflow::prelude::*;
//!
//! let (pipeline, handle) = PipelineBuilder::new("greetings")
//!     .source("chunks", my_producer)
//!     .transform("lines", LineSplitter::lines())
//!     .sink("store", my_consumer)
//!     .build()?;
//!
//! let report = pipeline.run().await?;
//! handle.wait().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]

pub mod cancellation;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::core::{Chunk, ChunkData, ChunkQueue, StageState, Watermarks};
    pub use crate::errors::{
        BuildError, PipelineError, SinkError, SourceError, TransformError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipeEvent,
    };
    pub use crate::pipeline::{
        CompletionHandle, PipeLink, Pipeline, PipelineBuilder, PipelineReport, SingleFlight,
    };
    pub use crate::stages::{
        ChunkProducer, LineSplitter, RecordConsumer, RecordTransform, SimulatedConsumer,
        SinkStage, SourceStage, TransformStage,
    };
    pub use crate::utils::{generate_uuid, iso_timestamp};
}
