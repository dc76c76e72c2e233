use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::Notify;
use writable_stream::{UnderlyingSink, WritableStreamDefaultController};

use super::RecordedEvent;

/// A sink whose `write`/`close` block on an explicit gate until the test
/// calls [`GatedSinkHandle::release`], so a test can observe a genuine
/// in-flight window instead of every sink call settling instantly.
/// `abort` never gates: the spec only ever races abort against an
/// already-dispatched write or close, not against itself.
pub struct GatedSink<W> {
    events: Rc<RefCell<Vec<RecordedEvent<W>>>>,
    gate: Rc<Notify>,
}

#[derive(Clone)]
pub struct GatedSinkHandle<W> {
    events: Rc<RefCell<Vec<RecordedEvent<W>>>>,
    gate: Rc<Notify>,
}

impl<W> GatedSink<W> {
    pub fn new() -> (Self, GatedSinkHandle<W>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let gate = Rc::new(Notify::new());
        (
            Self {
                events: events.clone(),
                gate: gate.clone(),
            },
            GatedSinkHandle { events, gate },
        )
    }
}

impl<W> GatedSinkHandle<W> {
    pub fn events(&self) -> Vec<RecordedEvent<W>>
    where
        W: Clone,
    {
        self.events.borrow().clone()
    }

    /// Lets exactly one gated `write`/`close` call proceed.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait(?Send)]
impl<W: 'static> UnderlyingSink<W, String> for GatedSink<W> {
    async fn start(
        &mut self,
        _controller: &WritableStreamDefaultController<W, String>,
    ) -> Result<(), String> {
        self.events.borrow_mut().push(RecordedEvent::Start);
        Ok(())
    }

    async fn write(
        &mut self,
        chunk: W,
        _controller: &WritableStreamDefaultController<W, String>,
    ) -> Result<(), String> {
        self.gate.notified().await;
        self.events.borrow_mut().push(RecordedEvent::Write(chunk));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), String> {
        self.gate.notified().await;
        self.events.borrow_mut().push(RecordedEvent::Close);
        Ok(())
    }

    async fn abort(&mut self, reason: String) -> Result<(), String> {
        self.events.borrow_mut().push(RecordedEvent::Abort(reason));
        Ok(())
    }
}
