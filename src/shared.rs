//! The merged Stream+Controller record.
//!
//! See DESIGN.md for why `Stream` and `Controller` share one
//! `Rc<RefCell<Shared<W, E>>>` instead of two separate cells that would
//! otherwise borrow each other across the Stream/Controller call
//! boundary.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::StreamError;
use crate::queue::SizeQueue;
use crate::signal::Signal;
use crate::sink::UnderlyingSink;
use crate::strategy::QueuingStrategy;

/// Canonical stream state. `storedError` is folded into
/// the `Errored` variant so "storedError is set iff state = errored"
/// holds by construction.
pub(crate) enum State<E> {
    Writable,
    Closed,
    Errored(StreamError<E>),
}

impl<E> State<E> {
    pub fn is_writable(&self) -> bool {
        matches!(self, State::Writable)
    }

    pub fn stored_error(&self) -> Option<&StreamError<E>> {
        match self {
            State::Errored(e) => Some(e),
            _ => None,
        }
    }
}

/// An abort recorded while some sink operation was already in flight.
pub(crate) struct PendingAbort<E> {
    pub reason: E,
    pub completion: Signal<E>,
}

/// The controller's own fields.
pub(crate) struct ControllerState<W, E> {
    pub queue: SizeQueue<W>,
    pub strategy: QueuingStrategy<W, E>,
    pub started: bool,
    /// `None` only for the duration of a dispatched sink operation: taken
    /// out before the `.await` so no `RefCell` borrow is held across a
    /// suspension point, put back afterwards. Grounded directly on
    /// `writable/into_underlying_sink.rs`'s `Inner::sink: Option<_>`
    /// take-and-replace dance.
    pub sink: Option<Box<dyn UnderlyingSink<W, E>>>,
    /// Guards against spawning a second concurrent advance loop; see
    /// `controller.rs::try_schedule_advance`.
    pub advancing: bool,
}

/// The merged Stream+Controller state.
pub(crate) struct Shared<W, E> {
    pub state: State<E>,
    pub has_writer: bool,
    pub controller: ControllerState<W, E>,

    pub write_requests: VecDeque<Signal<E>>,
    pub inflight_write_request: Option<Signal<E>>,
    pub close_request: Option<Signal<E>>,
    pub inflight_close_request: Option<Signal<E>>,
    pub pending_abort: Option<PendingAbort<E>>,

    pub backpressure: bool,
    /// Lives centrally rather than on a `Writer` struct: since at most one
    /// writer is ever attached, these naturally belong to the shared
    /// record and are simply reset whenever a new writer attaches (see
    /// `writer.rs::Writer::new`).
    pub ready: Signal<E>,
    pub closed: Signal<E>,
}

/// A shared handle to the merged Stream+Controller state. Every public
/// type (`WritableStream`, `WritableStreamDefaultWriter`,
/// `WritableStreamDefaultController`) is a thin wrapper around a clone of
/// one of these.
pub(crate) type SharedCell<W, E> = Rc<RefCell<Shared<W, E>>>;

impl<W, E: Clone> Shared<W, E> {
    pub fn new(strategy: QueuingStrategy<W, E>, sink: Box<dyn UnderlyingSink<W, E>>) -> SharedCell<W, E> {
        let initial_bp = strategy.high_water_mark <= 0.0;
        Rc::new(RefCell::new(Self {
            state: State::Writable,
            has_writer: false,
            controller: ControllerState {
                queue: SizeQueue::new(),
                strategy,
                started: false,
                sink: Some(sink),
                advancing: false,
            },
            write_requests: VecDeque::new(),
            inflight_write_request: None,
            close_request: None,
            inflight_close_request: None,
            pending_abort: None,
            backpressure: initial_bp,
            ready: if initial_bp {
                Signal::pending()
            } else {
                Signal::resolved()
            },
            closed: Signal::pending(),
        }))
    }
}
