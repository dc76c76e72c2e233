//! Size Queue: an ordered sequence of sized records.

use std::collections::VecDeque;

use crate::error::ContractError;

/// One entry in the controller's internal queue: either a chunk pending
/// dispatch to the sink, or the zero-sized `close` sentinel.
///
/// A chunk's payload is an `Option` so that `take_chunk` can hand
/// ownership to the sink while the record — and its size — stays put in
/// the queue until the write actually finishes: the head is only
/// *dequeued*, and `total_size` only recomputed, once the sink's `write`
/// has fulfilled.
enum Record<W> {
    Chunk(Option<W>),
    Close,
}

/// An ordered sequence of `{value, size}` pairs with a running total.
/// Caches `total_size` so it stays O(1) to read.
pub(crate) struct SizeQueue<W> {
    records: VecDeque<(Record<W>, f64)>,
    total_size: f64,
}

impl<W> SizeQueue<W> {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            total_size: 0.0,
        }
    }

    /// Appends a chunk record. Fails if `size` is NaN, negative, or
    /// non-finite — `+infinity` is rejected too; see DESIGN.md.
    pub fn enqueue_chunk(&mut self, chunk: W, size: f64) -> Result<(), ContractError> {
        if !size.is_finite() || size < 0.0 {
            return Err(ContractError::InvalidSize);
        }
        self.total_size += size;
        self.records.push_back((Record::Chunk(Some(chunk)), size));
        Ok(())
    }

    /// Appends the zero-sized `close` sentinel.
    pub fn enqueue_close(&mut self) {
        self.records.push_back((Record::Close, 0.0));
    }

    pub fn peek_is_close(&self) -> Option<bool> {
        self.records.front().map(|(r, _)| matches!(r, Record::Close))
    }

    /// Takes ownership of the head chunk, leaving its (still-sized) slot
    /// in place. Panics if the head isn't a chunk, or has already been
    /// taken — both are invariant breaches: `advance` never dispatches
    /// two writes at once.
    pub fn take_chunk(&mut self) -> W {
        match &mut self.records.front_mut().expect("take_chunk on empty queue").0 {
            Record::Chunk(slot) => slot.take().expect("chunk already taken from head"),
            Record::Close => unreachable!("take_chunk on a close record"),
        }
    }

    /// Removes the head record entirely and recomputes `total_size`.
    /// Called once the sink has actually finished with the head (a
    /// fulfilled write, or unconditionally for the close sentinel).
    pub fn finish_head(&mut self) {
        let (_, size) = self.records.pop_front().expect("finish_head on empty queue");
        self.total_size -= size;
    }

    pub fn total_size(&self) -> f64 {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every queued record, e.g. on abort or after a write rejects.
    pub fn clear(&mut self) {
        self.records.clear();
        self.total_size = 0.0;
    }
}
