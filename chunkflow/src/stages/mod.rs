//! Pipeline stages and the collaborator traits they wrap.
//!
//! A stage owns its own queue and watermark state exclusively; only the
//! pipe controller mutates pause/resume state between stages.

mod sink;
mod source;
mod transform;

pub use sink::{SimulatedConsumer, SinkStage};
pub use source::SourceStage;
pub use transform::{LineSplitter, TransformStage};

use crate::core::Chunk;
use crate::errors::{SinkError, SourceError, TransformError};
use async_trait::async_trait;

/// Collaborator that supplies raw chunks to a [`SourceStage`].
///
/// The pipeline consumes producers through this pull contract only; where
/// the bytes come from (file, socket, in-memory generator) is out of scope.
#[async_trait]
pub trait ChunkProducer: Send {
    /// Produces the next chunk, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when production fails; the enclosing
    /// pipeline aborts.
    async fn next(&mut self) -> Result<Option<Chunk>, SourceError>;
}

/// Record-reassembly logic hosted by a [`TransformStage`].
///
/// Implementations own their carry state. `write` may emit zero or more
/// derived chunks per input chunk; `flush` is called exactly once by the
/// enclosing stage after the last input chunk.
pub trait RecordTransform: Send {
    /// Consumes one inbound chunk and returns the derived chunks, in order.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] for malformed input; the enclosing
    /// pipeline aborts and no flush occurs.
    fn write(&mut self, chunk: &Chunk) -> Result<Vec<Chunk>, TransformError>;

    /// Emits the trailing partial record at end of input, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when the trailing state is
    /// unreassemblable.
    fn flush(&mut self) -> Result<Option<Chunk>, TransformError>;
}

/// Collaborator performing a sink's asynchronous per-item work.
#[async_trait]
pub trait RecordConsumer: Send {
    /// Processes one chunk. Called strictly in FIFO submission order; the
    /// next call starts only after the previous one returned.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on per-item failure; the sink moves to
    /// `Errored` and remaining queued items are discarded.
    async fn process(&mut self, chunk: &Chunk) -> Result<(), SinkError>;
}
