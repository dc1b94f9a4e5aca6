//! Core data model: chunks, stage states, and bounded queues.

mod chunk;
mod queue;
mod state;

pub use chunk::{Chunk, ChunkData};
pub use queue::{ChunkQueue, Watermarks};
pub use state::{StageState, StateCell};
