//! The Writer component: the exclusive handle a producer uses to write,
//! close, abort, and release the lock.
//!
//! Grounded on `writable/default_writer.rs`'s method set
//! (`closed`/`desired_size`/`ready`/`abort`/`write`/`close`) and its
//! `impl Drop` releasing the lock on drop.

use std::fmt;

use crate::controller::{controller_close, controller_write};
use crate::error::{ContractError, StreamError, WriterError};
use crate::shared::{SharedCell, State};
use crate::signal::Signal;
use crate::stream::{add_write_request, attach_writer, stream_abort};

/// A [`WritableStreamDefaultWriter`] locks a [`WritableStream`](crate::WritableStream)
/// to itself for the duration of its existence; dropping it (or calling
/// [`release_lock`](Self::release_lock) explicitly) releases the lock.
pub struct WritableStreamDefaultWriter<W, E> {
    shared: SharedCell<W, E>,
    ready: Signal<E>,
    closed: Signal<E>,
    released: bool,
}

impl<W, E> fmt::Debug for WritableStreamDefaultWriter<W, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableStreamDefaultWriter")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl<W: 'static, E: Clone + 'static> WritableStreamDefaultWriter<W, E> {
    pub(crate) fn new(shared: SharedCell<W, E>) -> Result<Self, ContractError> {
        let (ready, closed) = attach_writer(&shared)?;
        Ok(Self {
            shared,
            ready,
            closed,
            released: false,
        })
    }

    /// Waits for the stream to close cleanly while this writer holds the
    /// lock; rejects if the stream errors, or once the lock is released.
    pub async fn closed(&self) -> Result<(), WriterError<E>> {
        self.closed.wait().await.map_err(Into::into)
    }

    /// Waits until backpressure clears.
    pub async fn ready(&self) -> Result<(), WriterError<E>> {
        self.ready.wait().await.map_err(Into::into)
    }

    /// `null` if errored or a pending abort exists, `0` if closed, else
    /// `hwm - totalSize`. Fails if the lock has been released.
    pub fn desired_size(&self) -> Result<Option<f64>, ContractError> {
        if self.released {
            return Err(ContractError::LockReleased);
        }
        let inner = self.shared.borrow();
        Ok(match &inner.state {
            State::Errored(_) => None,
            State::Closed => Some(0.0),
            State::Writable => {
                if inner.pending_abort.is_some() {
                    None
                } else {
                    Some(crate::stream::desired_size_raw(&inner))
                }
            }
        })
    }

    /// Writes `chunk`, returning once the sink's `write()` for it settles.
    pub async fn write(&mut self, chunk: W) -> Result<(), WriterError<E>> {
        let request = {
            if self.released {
                return Err(ContractError::LockReleased.into());
            }
            let mut inner = self.shared.borrow_mut();
            match &inner.state {
                State::Closed => return Err(ContractError::NotWritable.into()),
                State::Errored(e) => return Err(e.clone().into()),
                State::Writable => {}
            }
            if inner.close_request.is_some() {
                return Err(ContractError::CloseAlreadyRequested.into());
            }
            add_write_request(&mut inner)
        };
        controller_write(&self.shared, chunk);
        request.wait().await.map_err(Into::into)
    }

    /// Closes the stream once every previously-queued chunk has been
    /// written.
    pub async fn close(&mut self) -> Result<(), WriterError<E>> {
        let request = {
            if self.released {
                return Err(ContractError::LockReleased.into());
            }
            let mut inner = self.shared.borrow_mut();
            match &inner.state {
                State::Closed => return Err(ContractError::NotWritable.into()),
                State::Errored(e) => return Err(e.clone().into()),
                State::Writable => {}
            }
            if inner.close_request.is_some() {
                return Err(ContractError::CloseAlreadyRequested.into());
            }
            let signal = Signal::pending();
            inner.close_request = Some(signal.clone());
            // A closing stream accepts no further chunks, so it's
            // trivially "ready" from here on.
            inner.ready.resolve();
            signal
        };
        controller_close(&self.shared);
        request.wait().await.map_err(Into::into)
    }

    /// Forwards to the stream's abort path, bypassing the lock check that
    /// applies to the stream-level surface — the writer owning the lock
    /// is always authorized.
    pub async fn abort(&mut self, reason: E) -> Result<(), WriterError<E>> {
        if self.released {
            return Err(ContractError::LockReleased.into());
        }
        stream_abort(&self.shared, reason, true).await
    }

    /// A close that tolerates the stream already being closed, or
    /// already closing — used by pipe-shaped consumers that want to
    /// close without caring whether someone else already asked.
    pub async fn close_with_error_propagation(&mut self) -> Result<(), WriterError<E>> {
        if self.released {
            return Err(ContractError::LockReleased.into());
        }
        let already_closing_or_closed = {
            let inner = self.shared.borrow();
            match &inner.state {
                State::Closed => true,
                State::Writable => inner.close_request.is_some(),
                State::Errored(e) => return Err(e.clone().into()),
            }
        };
        if already_closing_or_closed {
            Ok(())
        } else {
            self.close().await
        }
    }

    /// Detaches from the stream. A no-op if already released. The stream,
    /// its queue, and any in-flight sink operation continue unaffected;
    /// their completions simply no longer signal this writer.
    pub fn release_lock(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut inner = self.shared.borrow_mut();
        inner.has_writer = false;
        if self.ready.is_pending() {
            self.ready.reject(StreamError::LockReleased);
        } else {
            self.ready.force_rejected(StreamError::LockReleased);
        }
        let in_flight = inner.inflight_write_request.is_some() || inner.inflight_close_request.is_some();
        if inner.state.is_writable() || in_flight {
            self.closed.reject(StreamError::LockReleased);
        } else {
            self.closed.force_rejected(StreamError::LockReleased);
        }
    }
}

impl<W, E> Drop for WritableStreamDefaultWriter<W, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut inner = self.shared.borrow_mut();
        inner.has_writer = false;
        // `Signal::reject`/`force_rejected` don't require `E: Clone` to be
        // constructed here since `StreamError::LockReleased` carries no
        // payload; no clone of `E` is needed on the drop path.
        if self.ready.is_pending() {
            self.ready.reject(StreamError::LockReleased);
        } else {
            self.ready.force_rejected(StreamError::LockReleased);
        }
        let in_flight = inner.inflight_write_request.is_some() || inner.inflight_close_request.is_some();
        if inner.state.is_writable() || in_flight {
            self.closed.reject(StreamError::LockReleased);
        } else {
            self.closed.force_rejected(StreamError::LockReleased);
        }
    }
}
