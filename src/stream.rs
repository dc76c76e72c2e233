//! The Stream component: canonical state, the pending write/close queue,
//! notifications delivered by the Controller once a sink operation
//! settles, and the public [`WritableStream`] surface (`abort`,
//! `get_writer`, `locked`).
//!
//! Grounded on `writable/mod.rs`'s `WritableStream` (`is_locked`, `abort`,
//! `abort_with_reason`, `get_writer`/`try_get_writer`).

use std::fmt;

use crate::controller::{run_sink_abort, run_start};
use crate::error::{ContractError, StreamError, WriterError};
use crate::shared::{PendingAbort, Shared, SharedCell, State};
use crate::signal::Signal;
use crate::sink::UnderlyingSink;
use crate::strategy::QueuingStrategy;
use crate::writer::WritableStreamDefaultWriter;

/// A destination for chunks produced by a single producer at a time and
/// consumed serially by an [`UnderlyingSink`].
///
/// Must be constructed while a `tokio` [`LocalSet`](tokio::task::LocalSet)
/// is active: the controller's dispatch loop runs as a spawned local task
/// (see `controller.rs`), since this core is deliberately `!Send` —
/// single-writer, single-threaded-cooperative.
pub struct WritableStream<W, E> {
    shared: SharedCell<W, E>,
}

impl<W, E> fmt::Debug for WritableStream<W, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableStream")
            .field("locked", &self.locked())
            .finish_non_exhaustive()
    }
}

impl<W: 'static, E: Clone + 'static> WritableStream<W, E> {
    /// Creates a new stream, wiring it to `sink` through `strategy`. Kicks
    /// off the sink's `start()` as a background local task.
    pub fn new(sink: impl UnderlyingSink<W, E> + 'static, strategy: QueuingStrategy<W, E>) -> Self {
        let shared = Shared::new(strategy, Box::new(sink));
        tokio::task::spawn_local(run_start(shared.clone()));
        Self { shared }
    }

    /// `true` while a writer is attached: `writer` is set iff the stream
    /// is locked.
    #[inline]
    pub fn locked(&self) -> bool {
        self.shared.borrow().has_writer
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.shared.borrow().state, State::Closed)
    }

    #[inline]
    pub fn is_errored(&self) -> bool {
        matches!(self.shared.borrow().state, State::Errored(_))
    }

    /// Reads the stored error, if any. Diagnostic accessor; cloning is
    /// cheap to moderate depending on `E`.
    pub fn stored_error(&self) -> Option<StreamError<E>> {
        self.shared.borrow().state.stored_error().cloned()
    }

    /// Creates a [writer](WritableStreamDefaultWriter) and locks the
    /// stream to it. Fails if already locked.
    pub fn get_writer(&mut self) -> Result<WritableStreamDefaultWriter<W, E>, ContractError> {
        WritableStreamDefaultWriter::new(self.shared.clone())
    }

    /// Aborts the stream. Only callable while unlocked — call
    /// [`WritableStreamDefaultWriter::abort`] instead while holding the
    /// writer.
    pub async fn abort(&mut self, reason: E) -> Result<(), WriterError<E>> {
        stream_abort(&self.shared, reason, false).await
    }
}

pub(crate) fn desired_size_raw<W, E>(inner: &Shared<W, E>) -> f64 {
    inner.controller.strategy.high_water_mark - inner.controller.queue.total_size()
}

fn backpressure_from<W, E>(inner: &Shared<W, E>) -> bool {
    desired_size_raw(inner) <= 0.0
}

pub(crate) fn reject_or_force<E: Clone>(signal: &Signal<E>, err: StreamError<E>) {
    if signal.is_pending() {
        signal.reject(err);
    } else {
        signal.force_rejected(err);
    }
}

/// Recomputes whether the writer's `ready` should be pending or
/// resolved. Precondition: `state = writable` and no close requested —
/// callers (`controller.rs`) only invoke this when that already holds.
pub(crate) fn update_backpressure<W, E: Clone>(inner: &mut Shared<W, E>, bp: bool) {
    if inner.backpressure != bp {
        if inner.has_writer {
            if bp {
                inner.ready.reset_pending();
            } else {
                inner.ready.resolve();
            }
        }
        inner.backpressure = bp;
    }
}

/// Registers a new write's completion signal. Precondition: locked,
/// `state = writable` — checked by `Writer::write` before calling this.
pub(crate) fn add_write_request<W, E: Clone>(inner: &mut Shared<W, E>) -> Signal<E> {
    let signal = Signal::pending();
    inner.write_requests.push_back(signal.clone());
    signal
}

/// Unconditionally moves the stream to `errored` with `err`, rejecting
/// everything that's still pending — `ready`, `closed`, every queued (not
/// yet in-flight) write/close request, and any pending abort. No-op if
/// already non-writable: once the stream leaves `writable`, it never
/// returns.
///
/// Deliberately leaves `inflight_write_request`/`inflight_close_request`
/// untouched: those settle through `finish_inflight_*`, which call this
/// only *after* taking their own slot, so there's nothing left here to
/// double-settle.
pub(crate) fn transition_to_errored<W, E: Clone>(shared: &SharedCell<W, E>, err: StreamError<E>) {
    let mut inner = shared.borrow_mut();
    if !inner.state.is_writable() {
        return;
    }
    tracing::warn!("stream entering errored state");
    inner.state = State::Errored(err.clone());
    reject_or_force(&inner.ready, err.clone());
    reject_or_force(&inner.closed, err.clone());
    while let Some(signal) = inner.write_requests.pop_front() {
        signal.reject(err.clone());
    }
    if let Some(signal) = inner.close_request.take() {
        signal.reject(err.clone());
    }
    if let Some(pending) = inner.pending_abort.take() {
        pending.completion.reject(err.clone());
    }
    inner.controller.queue.clear();
}

/// Attaches a writer, initializing fresh `ready`/`closed` signals for the
/// stream's current state. Returns the pair so `Writer::new` can keep its
/// own clone — a later writer's attach replaces `Shared`'s fields with
/// new signal objects, so a released writer's own copies stay frozen at
/// whatever they last observed.
pub(crate) fn attach_writer<W, E: Clone>(
    shared: &SharedCell<W, E>,
) -> Result<(Signal<E>, Signal<E>), ContractError> {
    let mut inner = shared.borrow_mut();
    if inner.has_writer {
        return Err(ContractError::AlreadyLocked);
    }
    inner.has_writer = true;
    let (ready, closed) = match &inner.state {
        State::Writable => {
            let ready = if let Some(pending) = &inner.pending_abort {
                Signal::rejected(StreamError::Aborted(pending.reason.clone()))
            } else if inner.backpressure {
                Signal::pending()
            } else {
                Signal::resolved()
            };
            (ready, Signal::pending())
        }
        State::Closed => (Signal::resolved(), Signal::resolved()),
        State::Errored(e) => (Signal::rejected(e.clone()), Signal::rejected(e.clone())),
    };
    inner.ready = ready.clone();
    inner.closed = closed.clone();
    Ok((ready, closed))
}

enum AbortPlan<E> {
    AlreadyClosed,
    AlreadyErrored(StreamError<E>),
    WaitFor(Signal<E>),
    DispatchNow,
}

/// `WritableStream::abort`/the writer's authorized abort path.
/// `bypass_lock_check` is `true` when called through the attached writer
/// (which is authorized to abort its own stream), `false` for the
/// stream-level surface (disallowed while locked).
pub(crate) async fn stream_abort<W: 'static, E: Clone + 'static>(
    shared: &SharedCell<W, E>,
    reason: E,
    bypass_lock_check: bool,
) -> Result<(), WriterError<E>> {
    let plan = {
        let mut inner = shared.borrow_mut();
        match &inner.state {
            State::Closed => AbortPlan::AlreadyClosed,
            State::Errored(e) => AbortPlan::AlreadyErrored(e.clone()),
            State::Writable => {
                if !bypass_lock_check && inner.has_writer {
                    return Err(ContractError::AlreadyLocked.into());
                }
                if inner.pending_abort.is_some() {
                    return Err(ContractError::AbortPending.into());
                }
                reject_or_force(&inner.ready, StreamError::Aborted(reason.clone()));
                if inner.inflight_write_request.is_some() || inner.inflight_close_request.is_some() {
                    let completion = Signal::pending();
                    inner.pending_abort = Some(PendingAbort {
                        reason: reason.clone(),
                        completion: completion.clone(),
                    });
                    AbortPlan::WaitFor(completion)
                } else {
                    AbortPlan::DispatchNow
                }
            }
        }
    };

    match plan {
        AbortPlan::AlreadyClosed => Ok(()),
        AbortPlan::AlreadyErrored(e) => Err(e.into()),
        AbortPlan::WaitFor(completion) => completion.wait().await.map_err(Into::into),
        AbortPlan::DispatchNow => {
            transition_to_errored(shared, StreamError::Aborted(reason.clone()));
            run_sink_abort(shared, reason)
                .await
                .map_err(|e| WriterError::Stream(StreamError::Sink(e)))
        }
    }
}

/// Settles the in-flight write's completion signal and recomputes
/// state. Returns whether the controller's advance loop should keep
/// going.
pub(crate) async fn finish_inflight_write<W: 'static, E: Clone + 'static>(
    shared: &SharedCell<W, E>,
) -> bool {
    let pending_abort = {
        let mut inner = shared.borrow_mut();
        if let Some(request) = inner.inflight_write_request.take() {
            request.resolve();
        }
        if !inner.state.is_writable() {
            // A concurrent `controller.error()` arrived during the await;
            // `transition_to_errored` already rejected everything else.
            None
        } else {
            inner.controller.queue.finish_head();
            if inner.close_request.is_none() {
                let bp = backpressure_from(&inner);
                update_backpressure(&mut inner, bp);
            }
            inner.pending_abort.take()
        }
    };
    match pending_abort {
        Some(pending) => {
            dispatch_abort_for_pending(shared, pending).await;
            false
        }
        None => shared.borrow().state.is_writable(),
    }
}

/// Rejects the in-flight write's completion signal and errors the
/// stream.
pub(crate) fn finish_inflight_write_with_error<W, E: Clone>(shared: &SharedCell<W, E>, reason: E) {
    {
        let mut inner = shared.borrow_mut();
        if let Some(request) = inner.inflight_write_request.take() {
            request.reject(StreamError::Sink(reason.clone()));
        }
    }
    transition_to_errored(shared, StreamError::Sink(reason));
}

/// Settles the in-flight close's completion signal and transitions the
/// stream to `closed`, unless an abort arrived while the close was in
/// flight.
pub(crate) async fn finish_inflight_close<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>) {
    let pending_abort = {
        let mut inner = shared.borrow_mut();
        if let Some(request) = inner.inflight_close_request.take() {
            request.resolve();
        }
        inner.pending_abort.take()
    };
    match pending_abort {
        Some(pending) => {
            {
                let mut inner = shared.borrow_mut();
                if inner.state.is_writable() {
                    inner.state = State::Errored(StreamError::AbortedAfterClose);
                }
                reject_or_force(&inner.closed, StreamError::AbortedAfterClose);
            }
            pending.completion.resolve();
        }
        None => {
            let mut inner = shared.borrow_mut();
            inner.closed.resolve();
            inner.state = State::Closed;
        }
    }
}

/// Rejects the in-flight close's completion signal and errors the
/// stream.
pub(crate) fn finish_inflight_close_with_error<W, E: Clone>(shared: &SharedCell<W, E>, reason: E) {
    {
        let mut inner = shared.borrow_mut();
        if let Some(request) = inner.inflight_close_request.take() {
            request.reject(StreamError::Sink(reason.clone()));
        }
    }
    transition_to_errored(shared, StreamError::Sink(reason));
}

async fn dispatch_abort_for_pending<W: 'static, E: Clone + 'static>(
    shared: &SharedCell<W, E>,
    pending: PendingAbort<E>,
) {
    transition_to_errored(shared, StreamError::Aborted(pending.reason.clone()));
    match run_sink_abort(shared, pending.reason).await {
        Ok(()) => pending.completion.resolve(),
        Err(e) => pending.completion.reject(StreamError::Sink(e)),
    }
}
