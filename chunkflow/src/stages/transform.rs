//! Transform stage: chunk reassembly with a carry buffer and flush-once.

use super::RecordTransform;
use crate::core::{Chunk, StageState, StateCell};
use crate::errors::TransformError;
use tracing::debug;

/// A transform stage wrapping a [`RecordTransform`].
///
/// The stage enforces the flush-once contract: `complete()` runs the inner
/// flush exactly once, after the last input chunk, and never after an
/// error.
pub struct TransformStage {
    name: String,
    inner: Box<dyn RecordTransform>,
    state: StateCell,
    flushed: bool,
    records_out: u64,
}

impl TransformStage {
    /// Creates a new transform stage.
    pub fn new(name: impl Into<String>, inner: impl RecordTransform + 'static) -> Self {
        Self {
            name: name.into(),
            inner: Box::new(inner),
            state: StateCell::new(),
            flushed: false,
            records_out: 0,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state.get()
    }

    /// Returns how many derived records this stage has emitted.
    #[must_use]
    pub fn records_out(&self) -> u64 {
        self.records_out
    }

    /// Consumes one inbound chunk, returning derived chunks in order.
    ///
    /// # Errors
    ///
    /// A [`TransformError`] moves the stage to `Errored` and aborts any
    /// pending flush.
    pub(crate) fn write(&mut self, chunk: &Chunk) -> Result<Vec<Chunk>, TransformError> {
        if self.state.is_terminal() {
            return Ok(Vec::new());
        }
        self.state.transition(StageState::Accepting);

        match self.inner.write(chunk) {
            Ok(records) => {
                self.records_out += records.len() as u64;
                Ok(records)
            }
            Err(err) => {
                self.state.transition(StageState::Errored);
                // Surface the enclosing stage's name, not the inner logic's.
                Err(TransformError::new(&self.name, err.reason))
            }
        }
    }

    /// Handles `complete()` from upstream: flushes exactly once, then moves
    /// to `Finished`. Idempotent on terminal stages.
    ///
    /// # Errors
    ///
    /// Propagates a flush-time [`TransformError`], moving the stage to
    /// `Errored`.
    pub(crate) fn complete(&mut self) -> Result<Option<Chunk>, TransformError> {
        if self.state.is_terminal() || self.flushed {
            return Ok(None);
        }
        self.flushed = true;
        self.state.transition(StageState::Ending);

        match self.inner.flush() {
            Ok(trailing) => {
                if trailing.is_some() {
                    self.records_out += 1;
                }
                self.state.transition(StageState::Finished);
                debug!(stage = %self.name, records_out = self.records_out, "transform flushed");
                Ok(trailing)
            }
            Err(err) => {
                self.state.transition(StageState::Errored);
                Err(TransformError::new(&self.name, err.reason))
            }
        }
    }

    /// Marks the stage errored when another stage aborts the chain.
    pub(crate) fn abort(&mut self) {
        self.state.transition(StageState::Errored);
    }
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .field("records_out", &self.records_out)
            .finish()
    }
}

/// Delimiter-based record reassembly over byte chunks.
///
/// Concatenates the carry buffer with each inbound chunk and cuts one
/// record per delimiter. The segment after the last delimiter (possibly
/// empty) becomes the new carry and is never emitted mid-stream, because
/// more input may still arrive. Records are emitted in object mode as
/// strings, weighted by record length.
///
/// Flush emits the trailing carry as a final record. A stream that ends
/// exactly on a delimiter produces no trailing empty record; the one
/// exception is a stream that never produced any record at all, which
/// flushes a single empty record so downstream observes at least one item.
pub struct LineSplitter {
    delimiter: u8,
    carry: Vec<u8>,
    records_cut: u64,
}

impl LineSplitter {
    /// Creates a splitter over an arbitrary single-byte delimiter.
    #[must_use]
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            carry: Vec::new(),
            records_cut: 0,
        }
    }

    /// Creates a newline splitter.
    #[must_use]
    pub fn lines() -> Self {
        Self::new(b'\n')
    }

    /// Returns the unconsumed tail held between chunks.
    #[must_use]
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    fn cut(&self, bytes: &[u8]) -> Result<Chunk, TransformError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| TransformError::new("line_splitter", "record is not valid utf-8"))?;
        Ok(Chunk::record(serde_json::json!(text)).with_weight(text.len() as u64))
    }
}

impl RecordTransform for LineSplitter {
    fn write(&mut self, chunk: &Chunk) -> Result<Vec<Chunk>, TransformError> {
        let bytes = chunk
            .as_bytes()
            .ok_or_else(|| TransformError::new("line_splitter", "expected a byte chunk"))?;
        self.carry.extend_from_slice(bytes);

        // Cursor-based scan over the owned carry; complete segments are cut
        // and the tail is retained without reallocating per record.
        let mut records = Vec::new();
        let mut start = 0;
        for cursor in 0..self.carry.len() {
            if self.carry[cursor] == self.delimiter {
                records.push(self.cut(&self.carry[start..cursor])?);
                start = cursor + 1;
            }
        }
        self.carry.drain(..start);
        self.records_cut += records.len() as u64;
        Ok(records)
    }

    fn flush(&mut self) -> Result<Option<Chunk>, TransformError> {
        if self.carry.is_empty() && self.records_cut > 0 {
            return Ok(None);
        }
        let carry = std::mem::take(&mut self.carry);
        let record = self.cut(&carry)?;
        self.records_cut += 1;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(records: &[Chunk]) -> Vec<String> {
        records
            .iter()
            .map(|c| c.as_text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_reassembly_across_chunk_boundaries() {
        let mut splitter = LineSplitter::lines();

        let first = splitter.write(&Chunk::text("ab\ncd\ne")).unwrap();
        assert_eq!(texts(&first), vec!["ab", "cd"]);
        assert_eq!(splitter.carry(), b"e");

        let second = splitter.write(&Chunk::text("f\n")).unwrap();
        assert_eq!(texts(&second), vec!["ef"]);
        assert_eq!(splitter.carry(), b"");

        // Carry already drained into a complete record; nothing to flush.
        assert!(splitter.flush().unwrap().is_none());
    }

    #[test]
    fn test_trailing_partial_is_never_emitted_early() {
        let mut splitter = LineSplitter::lines();
        let records = splitter.write(&Chunk::text("no delimiter yet")).unwrap();
        assert!(records.is_empty());

        let trailing = splitter.flush().unwrap().unwrap();
        assert_eq!(trailing.as_text(), Some("no delimiter yet"));
        assert_eq!(trailing.weight(), 16);
    }

    #[test]
    fn test_empty_stream_flushes_one_empty_record() {
        let mut splitter = LineSplitter::lines();
        let trailing = splitter.flush().unwrap().unwrap();
        assert_eq!(trailing.as_text(), Some(""));
    }

    #[test]
    fn test_record_weight_is_record_length() {
        let mut splitter = LineSplitter::lines();
        let records = splitter.write(&Chunk::text("Hello, World!\nBye\n")).unwrap();
        assert_eq!(records[0].weight(), 13);
        assert_eq!(records[1].weight(), 3);
    }

    #[test]
    fn test_invalid_utf8_fails_the_write() {
        let mut splitter = LineSplitter::lines();
        let err = splitter
            .write(&Chunk::bytes(vec![0xff, 0xfe, b'\n']))
            .unwrap_err();
        assert!(err.reason.contains("utf-8"));
    }

    #[test]
    fn test_object_mode_input_is_rejected() {
        let mut splitter = LineSplitter::lines();
        let err = splitter
            .write(&Chunk::record(serde_json::json!("x")))
            .unwrap_err();
        assert!(err.reason.contains("byte chunk"));
    }

    #[test]
    fn test_stage_flushes_exactly_once() {
        let mut stage = TransformStage::new("lines", LineSplitter::lines());
        stage.write(&Chunk::text("a")).unwrap();

        let first = stage.complete().unwrap();
        assert_eq!(first.unwrap().as_text(), Some("a"));
        assert_eq!(stage.state(), StageState::Finished);

        // Second complete is a no-op on the terminal stage.
        assert!(stage.complete().unwrap().is_none());
        assert_eq!(stage.records_out(), 1);
    }

    #[test]
    fn test_stage_error_aborts_pending_flush() {
        let mut stage = TransformStage::new("lines", LineSplitter::lines());
        stage.write(&Chunk::text("partial")).unwrap();
        stage
            .write(&Chunk::bytes(vec![0xff, b'\n']))
            .unwrap_err();

        assert_eq!(stage.state(), StageState::Errored);
        // The pending flush is aborted, not emitted.
        assert!(stage.complete().unwrap().is_none());
    }

    #[test]
    fn test_custom_delimiter() {
        let mut splitter = LineSplitter::new(b',');
        let records = splitter.write(&Chunk::text("a,b,c")).unwrap();
        assert_eq!(texts(&records), vec!["a", "b"]);
        assert_eq!(splitter.carry(), b"c");
    }
}
