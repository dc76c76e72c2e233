pub use failing_sink::FailingSink;
pub use gated_sink::{GatedSink, GatedSinkHandle};
pub use recording_sink::{RecordedEvent, RecordingSink};

pub mod failing_sink;
pub mod gated_sink;
pub mod recording_sink;

mod noop_waker {
    use std::task::{RawWaker, RawWakerVTable, Waker};

    unsafe fn clone(data: *const ()) -> RawWaker {
        RawWaker::new(data, &VTABLE)
    }
    unsafe fn no_op(_data: *const ()) {}

    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);

    pub fn waker() -> Waker {
        let raw = RawWaker::new(std::ptr::null(), &VTABLE);
        unsafe { Waker::from_raw(raw) }
    }
}

/// Polls `fut` exactly once with a waker that does nothing on wake, then
/// drops it. Used to run an `async fn(&mut self, ...)` call's synchronous
/// prefix (argument checks, request registration, dispatch scheduling)
/// without holding the borrow on `self` for the call's entire lifetime:
/// once dropped, the borrow is released, but anything the call already
/// spawned onto the executor keeps running independently.
///
/// Panics if `fut` resolves on the first poll — this helper is only for
/// calls that are known to suspend (e.g. a write dispatched to a gated
/// sink), since a call that completes synchronously would never need
/// this treatment in the first place.
pub fn poll_once_then_drop<F: std::future::Future>(fut: F) {
    use std::pin::pin;

    let mut fut = pin!(fut);
    poll_once_pending(fut.as_mut());
}

/// Polls an already-pinned future exactly once, asserting it stays
/// pending, without dropping it — unlike [`poll_once_then_drop`], the
/// caller keeps the future alive to `.await` its eventual result (e.g.
/// an `abort()` call that must wait out an in-flight write before it can
/// settle).
pub fn poll_once_pending<F: std::future::Future + ?Sized>(fut: std::pin::Pin<&mut F>) {
    use std::task::{Context, Poll};

    let waker = noop_waker::waker();
    let mut cx = Context::from_waker(&waker);
    match fut.poll(&mut cx) {
        Poll::Pending => {}
        Poll::Ready(_) => panic!("expected the polled future to suspend, but it completed"),
    }
}

/// Yields enough times to let every task already spawned onto the local
/// executor (the dispatch loop, and whatever it spawns in turn once
/// `sink.start()` settles) run up to its own next suspension point.
pub async fn drain_local_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Initializes a `tracing` subscriber that writes to the test harness's
/// captured output. Safe to call from every test: `try_init` no-ops if a
/// subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
