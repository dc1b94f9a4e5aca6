//! The unit of data passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// The payload carried by a [`Chunk`].
///
/// A chunk either carries an opaque byte sequence (the common case for
/// sources reading raw input) or a structured record (object mode, the
/// common case for transform output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkData {
    /// A raw byte sequence.
    Bytes(Vec<u8>),
    /// A structured record (object mode).
    Record(serde_json::Value),
}

/// An immutable unit of data moving through the pipeline.
///
/// Chunks are immutable once emitted by a stage. The `weight` field is a
/// processing-cost hint computed by the emitting stage (for example, record
/// length); sinks use it to parameterize per-item processing cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    data: ChunkData,
    weight: u64,
}

impl Chunk {
    /// Creates a byte chunk. Weight defaults to the payload length.
    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let weight = data.len() as u64;
        Self {
            data: ChunkData::Bytes(data),
            weight,
        }
    }

    /// Creates a byte chunk from a string.
    #[must_use]
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::bytes(text.as_ref().as_bytes().to_vec())
    }

    /// Creates an object-mode record chunk.
    ///
    /// Weight defaults to the length of the record's string form for string
    /// records, otherwise zero; override with [`Chunk::with_weight`].
    #[must_use]
    pub fn record(value: serde_json::Value) -> Self {
        let weight = value.as_str().map_or(0, |s| s.len() as u64);
        Self {
            data: ChunkData::Record(value),
            weight,
        }
    }

    /// Overrides the processing-cost hint.
    #[must_use]
    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    /// Returns the payload.
    #[must_use]
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    /// Returns the processing-cost hint.
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Returns the payload as bytes, if this is a byte chunk.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            ChunkData::Bytes(b) => Some(b),
            ChunkData::Record(_) => None,
        }
    }

    /// Returns the payload as a structured record, if in object mode.
    #[must_use]
    pub fn as_record(&self) -> Option<&serde_json::Value> {
        match &self.data {
            ChunkData::Record(v) => Some(v),
            ChunkData::Bytes(_) => None,
        }
    }

    /// Returns the payload as text: the record's string form for string
    /// records, or the byte payload decoded as UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            ChunkData::Bytes(b) => std::str::from_utf8(b).ok(),
            ChunkData::Record(v) => v.as_str(),
        }
    }

    /// Returns the payload length in bytes (string length for records).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.data {
            ChunkData::Bytes(b) => b.len(),
            ChunkData::Record(v) => v.as_str().map_or(0, str::len),
        }
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
