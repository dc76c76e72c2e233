//! A re-armable, multiply-observable completion slot.
//!
//! Maps a promise-plus-resolver pair onto a tagged variant:
//! `Pending{resolve, reject} | SettledResolved | SettledRejected(error)`.
//! Generalized to also back every write/close/abort completion (the
//! writer's own `ready`/`closed` plus each queued request's completion),
//! since those are exactly the same shape with a single observer instead
//! of many.
//!
//! Shared via `Rc<RefCell<_>>`, in the same single-threaded-cooperative
//! style as the teacher's `into_underlying_sink.rs` `Inner`: this crate
//! never needs `Send`, so there is no lock to take beyond the `RefCell`
//! borrow discipline.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::StreamError;

enum State<E> {
    Pending,
    Resolved,
    Rejected(StreamError<E>),
}

struct Inner<E> {
    state: State<E>,
    wakers: Vec<Waker>,
}

pub(crate) struct Signal<E> {
    inner: Rc<RefCell<Inner<E>>>,
}

impl<E> Clone for Signal<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone> Signal<E> {
    pub fn pending() -> Self {
        Self::with_state(State::Pending)
    }

    pub fn resolved() -> Self {
        Self::with_state(State::Resolved)
    }

    pub fn rejected(err: StreamError<E>) -> Self {
        Self::with_state(State::Rejected(err))
    }

    fn with_state(state: State<E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                wakers: Vec::new(),
            })),
        }
    }

    /// Resets an already-settled signal back to a fresh pending one, e.g.
    /// when backpressure is (re)applied.
    pub fn reset_pending(&self) {
        self.inner.borrow_mut().state = State::Pending;
    }

    /// Resolves this signal if it is still pending. No-op otherwise: a
    /// settled signal never settles twice.
    pub fn resolve(&self) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.state, State::Pending) {
            inner.state = State::Resolved;
            wake_all(&mut inner.wakers);
        }
    }

    /// Rejects this signal if it is still pending. No-op otherwise.
    pub fn reject(&self, err: StreamError<E>) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.state, State::Pending) {
            inner.state = State::Rejected(err);
            wake_all(&mut inner.wakers);
        }
    }

    /// Forces this slot directly to a rejected state, even if already
    /// settled — used when a writer is released and its `closed`/`ready`
    /// must be *reset* to a rejected promise rather than merely rejected.
    pub fn force_rejected(&self, err: StreamError<E>) {
        let mut inner = self.inner.borrow_mut();
        inner.state = State::Rejected(err);
        wake_all(&mut inner.wakers);
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending)
    }

    /// Returns a future that resolves when this signal settles. Can be
    /// called any number of times, including after settlement (mirrors a
    /// JS promise being awaitable repeatedly).
    pub fn wait(&self) -> Wait<E> {
        Wait {
            signal: self.clone(),
        }
    }
}

fn wake_all(wakers: &mut Vec<Waker>) {
    for waker in wakers.drain(..) {
        waker.wake();
    }
}

pub(crate) struct Wait<E> {
    signal: Signal<E>,
}

impl<E: Clone> Future for Wait<E> {
    type Output = Result<(), StreamError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.signal.inner.borrow_mut();
        match &inner.state {
            State::Pending => {
                inner.wakers.push(cx.waker().clone());
                Poll::Pending
            }
            State::Resolved => Poll::Ready(Ok(())),
            State::Rejected(err) => Poll::Ready(Err(err.clone())),
        }
    }
}
