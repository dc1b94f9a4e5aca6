//! Bounded FIFO chunk queue with watermark accounting.

use super::Chunk;
use crate::errors::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Pause/resume thresholds for a stage boundary.
///
/// A stage signals pause upstream once it holds `high` or more
/// unacknowledged chunks and signals resume once it drains back down to
/// `low` or fewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    /// Pause threshold. Must be at least 1.
    pub high: usize,
    /// Resume threshold. Must be strictly below `high`.
    pub low: usize,
}

impl Watermarks {
    /// Default pause threshold.
    pub const DEFAULT_HIGH: usize = 16;
    /// Default resume threshold.
    pub const DEFAULT_LOW: usize = 4;

    /// Creates a validated watermark pair.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidWatermarks`] unless `high >= 1` and
    /// `low < high`.
    pub fn new(high: usize, low: usize) -> Result<Self, BuildError> {
        if high == 0 || low >= high {
            return Err(BuildError::InvalidWatermarks { high, low });
        }
        Ok(Self { high, low })
    }
}

impl Default for Watermarks {
    fn default() -> Self {
        Self {
            high: Self::DEFAULT_HIGH,
            low: Self::DEFAULT_LOW,
        }
    }
}

/// A bounded FIFO buffer of chunks at a stage boundary.
///
/// Backed by a ring buffer so consumption advances a cursor instead of
/// reallocating the remaining items. `push` never drops: the queue reports
/// pressure through the watermark queries and relies on the controller to
/// stop the producer.
#[derive(Debug)]
pub struct ChunkQueue {
    items: VecDeque<Chunk>,
    watermarks: Watermarks,
}

impl ChunkQueue {
    /// Creates an empty queue with the given watermarks.
    #[must_use]
    pub fn new(watermarks: Watermarks) -> Self {
        Self {
            items: VecDeque::with_capacity(watermarks.high),
            watermarks,
        }
    }

    /// Enqueues a chunk.
    ///
    /// Returns `true` while the queue is below its high-water mark after
    /// the push; `false` signals that upstream should pause.
    pub fn push(&mut self, chunk: Chunk) -> bool {
        self.items.push_back(chunk);
        self.items.len() < self.watermarks.high
    }

    /// Dequeues the oldest chunk.
    pub fn pop(&mut self) -> Option<Chunk> {
        self.items.pop_front()
    }

    /// Discards all queued chunks, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    /// Returns the number of queued chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true once the queue holds `high` or more chunks.
    #[must_use]
    pub fn above_high_water(&self) -> bool {
        self.items.len() >= self.watermarks.high
    }

    /// Returns true once the queue has drained to `low` or fewer chunks.
    #[must_use]
    pub fn at_or_below_low_water(&self) -> bool {
        self.items.len() <= self.watermarks.low
    }

    /// Returns the configured watermarks.
    #[must_use]
    pub fn watermarks(&self) -> Watermarks {
        self.watermarks
    }
}
