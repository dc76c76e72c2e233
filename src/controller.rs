//! The Controller component: queue dispatch, backpressure computation,
//! and the sink-facing handle.
//!
//! The take-and-replace `Option<S>` dance around every `.await` on a sink
//! method is lifted directly from `writable/into_underlying_sink.rs`'s
//! `Inner::write`/`close`/`abort`: it's the only way to call an `.await`
//! on something reachable through a `RefCell` without holding the borrow
//! across the suspension point. `future_to_promise`'s role — running the
//! dispatch loop independently of whichever call triggered it — is played
//! here by `tokio::task::spawn_local`, since there is no browser
//! microtask queue to lean on off the wasm target.

use crate::error::StreamError;
use crate::shared::SharedCell;
use crate::sink::UnderlyingSink;
use crate::stream::{
    add_write_request, desired_size_raw, finish_inflight_close, finish_inflight_close_with_error,
    finish_inflight_write, finish_inflight_write_with_error, transition_to_errored,
    update_backpressure,
};

/// The handle a sink's `start`/`write` methods receive, and that a sink
/// may stash to call [`error`](Self::error) later.
pub struct WritableStreamDefaultController<W, E> {
    shared: SharedCell<W, E>,
}

impl<W, E> WritableStreamDefaultController<W, E> {
    pub(crate) fn new(shared: SharedCell<W, E>) -> Self {
        Self { shared }
    }
}

impl<W, E: Clone> WritableStreamDefaultController<W, E> {
    /// Errors the stream with `e`. Permitted at any time; a no-op if the
    /// stream has already left the `writable` state.
    pub fn error(&self, e: E) {
        transition_to_errored(&self.shared, StreamError::Sink(e));
    }

    /// `hwm - totalSize`, unaffected by closed/errored special-casing —
    /// that belongs to the writer-facing `desired_size`, not this
    /// read-only controller view.
    pub fn desired_size(&self) -> f64 {
        desired_size_raw(&self.shared.borrow())
    }
}

/// Runs `sink.start()` once, then lets the dispatch loop take over.
/// Spawned once per stream from `WritableStream::new`.
pub(crate) async fn run_start<W: 'static, E: Clone + 'static>(shared: SharedCell<W, E>) {
    let controller = WritableStreamDefaultController::new(shared.clone());
    let mut sink = {
        let mut inner = shared.borrow_mut();
        inner.controller.sink.take().expect("sink missing at start")
    };
    let result = sink.start(&controller).await;
    shared.borrow_mut().controller.sink = Some(sink);
    match result {
        Ok(()) => {
            tracing::debug!("sink start() fulfilled");
            shared.borrow_mut().controller.started = true;
            try_schedule_advance(&shared);
        }
        Err(e) => {
            tracing::warn!("sink start() rejected");
            transition_to_errored(&shared, StreamError::Sink(e));
        }
    }
}

/// Computes the chunk's size, enqueues it, recomputes backpressure, and
/// tries to advance. Any failure errors the stream and returns without
/// enqueueing.
pub(crate) fn controller_write<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>, chunk: W) {
    let should_advance = {
        let mut inner = shared.borrow_mut();
        if !inner.state.is_writable() {
            return;
        }
        let size = match inner.controller.strategy.compute_size(&chunk) {
            Ok(size) => size,
            Err(e) => {
                drop(inner);
                transition_to_errored(shared, StreamError::Sink(e));
                return;
            }
        };
        if inner.controller.queue.enqueue_chunk(chunk, size).is_err() {
            drop(inner);
            transition_to_errored(shared, StreamError::InvalidSize);
            return;
        }
        if inner.state.is_writable() && inner.close_request.is_none() {
            let bp = desired_size_raw(&inner) <= 0.0;
            update_backpressure(&mut inner, bp);
        }
        true
    };
    if should_advance {
        try_schedule_advance(shared);
    }
}

/// Enqueues the zero-sized `close` sentinel and tries to advance.
pub(crate) fn controller_close<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>) {
    shared.borrow_mut().controller.queue.enqueue_close();
    try_schedule_advance(shared);
}

/// Spawns the dispatch loop unless one is already running; the running
/// loop re-checks the queue on every iteration, so a second spawn would
/// only ever see "nothing to do" and return immediately.
fn try_schedule_advance<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>) {
    {
        let mut inner = shared.borrow_mut();
        if inner.controller.advancing || !inner.state.is_writable() {
            return;
        }
        inner.controller.advancing = true;
    }
    tokio::task::spawn_local(advance_loop(shared.clone()));
}

async fn advance_loop<W: 'static, E: Clone + 'static>(shared: SharedCell<W, E>) {
    loop {
        enum Action {
            Write,
            Close,
        }
        let action = {
            let mut inner = shared.borrow_mut();
            let ready_to_dispatch = inner.state.is_writable()
                && inner.controller.started
                && inner.inflight_write_request.is_none()
                && inner.inflight_close_request.is_none();
            if !ready_to_dispatch {
                inner.controller.advancing = false;
                return;
            }
            match inner.controller.queue.peek_is_close() {
                None => {
                    inner.controller.advancing = false;
                    return;
                }
                Some(true) => Action::Close,
                Some(false) => Action::Write,
            }
        };
        match action {
            Action::Write => {
                if !process_write(&shared).await {
                    shared.borrow_mut().controller.advancing = false;
                    return;
                }
            }
            Action::Close => {
                process_close(&shared).await;
                shared.borrow_mut().controller.advancing = false;
                return;
            }
        }
    }
}

/// Dispatches the head chunk to the sink. Returns whether the loop
/// should keep advancing.
async fn process_write<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>) -> bool {
    let chunk = {
        let mut inner = shared.borrow_mut();
        let request = inner
            .write_requests
            .pop_front()
            .expect("write request missing for a queued chunk");
        inner.inflight_write_request = Some(request);
        inner.controller.queue.take_chunk()
    };
    let controller = WritableStreamDefaultController::new(shared.clone());
    let mut sink = {
        let mut inner = shared.borrow_mut();
        inner.controller.sink.take().expect("sink missing while writing")
    };
    tracing::trace!("dispatching sink.write");
    let result = sink.write(chunk, &controller).await;
    shared.borrow_mut().controller.sink = Some(sink);
    match result {
        Ok(()) => {
            tracing::debug!("sink.write fulfilled");
            finish_inflight_write(shared).await
        }
        Err(e) => {
            tracing::warn!("sink.write rejected");
            finish_inflight_write_with_error(shared, e);
            false
        }
    }
}

/// Dispatches the close sentinel to the sink.
async fn process_close<W: 'static, E: Clone + 'static>(shared: &SharedCell<W, E>) {
    {
        let mut inner = shared.borrow_mut();
        let request = inner
            .close_request
            .take()
            .expect("close request missing for the close sentinel");
        inner.inflight_close_request = Some(request);
        debug_assert_eq!(inner.controller.queue.peek_is_close(), Some(true));
        inner.controller.queue.finish_head();
        debug_assert!(inner.controller.queue.is_empty());
    }
    let mut sink = {
        let mut inner = shared.borrow_mut();
        inner.controller.sink.take().expect("sink missing while closing")
    };
    tracing::trace!("dispatching sink.close");
    let result = sink.close().await;
    shared.borrow_mut().controller.sink = Some(sink);
    match result {
        Ok(()) => {
            tracing::debug!("sink.close fulfilled");
            finish_inflight_close(shared).await
        }
        Err(e) => {
            tracing::warn!("sink.close rejected");
            finish_inflight_close_with_error(shared, e);
        }
    }
}

/// Invokes `sink.abort(reason)` and returns its outcome. Queue clearing
/// happens in `transition_to_errored`, which every caller of this
/// already went through first.
pub(crate) async fn run_sink_abort<W, E>(shared: &SharedCell<W, E>, reason: E) -> Result<(), E> {
    let mut sink = {
        let mut inner = shared.borrow_mut();
        inner.controller.sink.take().expect("sink missing while aborting")
    };
    tracing::trace!("dispatching sink.abort");
    let result = sink.abort(reason).await;
    shared.borrow_mut().controller.sink = Some(sink);
    result
}
