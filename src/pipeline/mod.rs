//! Batched streaming pipelines.
//!
//! Every write path pushes items into a [`BatchPipeline`], which buffers them
//! and hands each full batch to a [`BatchSink`]. The caller blocks while a
//! batch is written, so a slow store slows the producer down.
//!
//! # Lifecycle
//!
//! ```text
//! Accepting --push/flush error--> Halted
//!     |
//!  finish(): flush remaining, close sink
//!     v
//! Finished
//! ```
//!
//! A halted pipeline drops the batch that failed and refuses further items
//! with [`Error::PipelineHalted`].

mod deleter;
mod importer;
mod stream;

pub use deleter::{DeleteSummary, Deleter, EdgeDeleter, QuadRemover, VertexDeleter};
pub use importer::{ImportSummary, QuadImporter};
pub use stream::QuadStream;

use crate::config::MAX_BATCH_SIZE;
use crate::{Error, Result};

/// Destination of a pipeline's batches.
pub trait BatchSink<T> {
    /// Value produced when the pipeline finishes.
    type Summary;

    /// Writes one batch.
    ///
    /// # Errors
    ///
    /// Any error halts the pipeline.
    fn flush_batch(&mut self, batch: Vec<T>) -> Result<()>;

    /// Releases resources once no batch will follow, and reports.
    fn close(&mut self) -> Self::Summary;
}

/// Bounded buffer that hands back a batch once `batch_size` items are held.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
    batch_size: usize,
}

impl<T> BatchBuffer<T> {
    /// Creates a buffer for batches of `batch_size`, clamped to
    /// `1..=MAX_BATCH_SIZE` so one batch always fits in a single statement.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        Self {
            items: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Adds an item, returning a full batch when the buffer fills up.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);
        if self.items.len() >= self.batch_size {
            Some(std::mem::replace(
                &mut self.items,
                Vec::with_capacity(self.batch_size),
            ))
        } else {
            None
        }
    }

    /// Takes the partial batch, if any.
    pub fn take_remaining(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }

    /// Discards buffered items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Taking items.
    Accepting,
    /// A batch failed; no further items are taken.
    Halted,
    /// Drained and closed.
    Finished,
}

/// A buffer in front of a sink.
pub struct BatchPipeline<T, S: BatchSink<T>> {
    buffer: BatchBuffer<T>,
    sink: S,
    state: PipelineState,
}

impl<T, S: BatchSink<T>> BatchPipeline<T, S> {
    /// Creates an accepting pipeline.
    pub fn new(sink: S, batch_size: usize) -> Self {
        Self {
            buffer: BatchBuffer::new(batch_size),
            sink,
            state: PipelineState::Accepting,
        }
    }

    /// Current state.
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// The sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Buffers `item`, writing a batch if the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineHalted`] if an earlier batch failed, or the
    /// sink's error if this push completed a batch that failed to write.
    pub fn push(&mut self, item: T) -> Result<()> {
        if self.state != PipelineState::Accepting {
            return Err(Error::PipelineHalted);
        }
        match self.buffer.push(item) {
            Some(batch) => self.flush(batch),
            None => Ok(()),
        }
    }

    /// Pushes every item, stopping at the first error.
    ///
    /// # Errors
    ///
    /// See [`Self::push`].
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> Result<()> {
        items.into_iter().try_for_each(|item| self.push(item))
    }

    fn flush(&mut self, batch: Vec<T>) -> Result<()> {
        self.sink.flush_batch(batch).inspect_err(|e| {
            tracing::warn!(error = %e, "Batch failed, halting pipeline");
            self.state = PipelineState::Halted;
            self.buffer.clear();
        })
    }

    /// Stops taking items, writes the partial batch and closes the sink.
    ///
    /// The sink is closed even when the pipeline halted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineHalted`] if an earlier batch failed, or the
    /// sink's error if the final batch fails.
    pub fn finish(mut self) -> Result<S::Summary> {
        let flushed = match (self.state, self.buffer.take_remaining()) {
            (PipelineState::Accepting, Some(batch)) => self.flush(batch),
            (PipelineState::Accepting, None) => Ok(()),
            _ => Err(Error::PipelineHalted),
        };
        let summary = self.sink.close();
        flushed?;
        self.state = PipelineState::Finished;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records batches; fails any batch containing `fail_on`.
    #[derive(Default)]
    struct RecordingSink {
        batches: Vec<Vec<u32>>,
        fail_on: Option<u32>,
        closed: bool,
    }

    impl BatchSink<u32> for RecordingSink {
        type Summary = Vec<Vec<u32>>;

        fn flush_batch(&mut self, batch: Vec<u32>) -> Result<()> {
            if self.fail_on.is_some_and(|n| batch.contains(&n)) {
                return Err(Error::OperationFailed {
                    operation: "flush".to_string(),
                    cause: "boom".to_string(),
                });
            }
            self.batches.push(batch);
            Ok(())
        }

        fn close(&mut self) -> Self::Summary {
            self.closed = true;
            std::mem::take(&mut self.batches)
        }
    }

    #[test]
    fn test_buffer_hands_back_full_batches() {
        let mut buffer = BatchBuffer::new(2);
        assert!(buffer.push(1).is_none());
        assert_eq!(buffer.push(2), Some(vec![1, 2]));
        assert!(buffer.is_empty());
        assert!(buffer.push(3).is_none());
        assert_eq!(buffer.take_remaining(), Some(vec![3]));
        assert_eq!(buffer.take_remaining(), None);
        assert_eq!(BatchBuffer::<u8>::new(0).batch_size(), 1);
    }

    #[test]
    fn test_buffer_caps_batch_size() {
        assert_eq!(BatchBuffer::<u8>::new(2000).batch_size(), MAX_BATCH_SIZE);
        assert_eq!(BatchBuffer::<u8>::new(MAX_BATCH_SIZE).batch_size(), MAX_BATCH_SIZE);

        let mut pipeline = BatchPipeline::new(RecordingSink::default(), usize::MAX);
        pipeline.extend(0..2000).unwrap();
        let batches = pipeline.finish().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_finish_flushes_partial_batch() {
        let mut pipeline = BatchPipeline::new(RecordingSink::default(), 3);
        pipeline.extend(1..=7).unwrap();
        assert_eq!(pipeline.sink().batches.len(), 2);
        let batches = pipeline.finish().unwrap();
        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn test_failed_batch_halts() {
        let sink = RecordingSink {
            fail_on: Some(4),
            ..RecordingSink::default()
        };
        let mut pipeline = BatchPipeline::new(sink, 2);
        pipeline.extend(1..=3).unwrap();
        assert!(matches!(pipeline.push(4), Err(Error::OperationFailed { .. })));
        assert_eq!(pipeline.state(), PipelineState::Halted);
        assert!(matches!(pipeline.push(5), Err(Error::PipelineHalted)));
        assert!(matches!(pipeline.finish(), Err(Error::PipelineHalted)));
    }

    #[test]
    fn test_failed_final_batch_is_reported() {
        let sink = RecordingSink {
            fail_on: Some(3),
            ..RecordingSink::default()
        };
        let mut pipeline = BatchPipeline::new(sink, 2);
        pipeline.extend(1..=3).unwrap();
        assert!(matches!(pipeline.finish(), Err(Error::OperationFailed { .. })));
    }
}
