use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use writable_stream::{UnderlyingSink, WritableStreamDefaultController};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent<W> {
    Start,
    Write(W),
    Close,
    Abort(String),
}

/// A sink that records every call made to it, for asserting call order
/// and arguments against. Cheap to clone: a test keeps one clone as an
/// observer while handing the other to the stream.
pub struct RecordingSink<W> {
    events: Rc<RefCell<Vec<RecordedEvent<W>>>>,
}

impl<W> Clone for RecordingSink<W> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<W> RecordingSink<W> {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn events(&self) -> Vec<RecordedEvent<W>>
    where
        W: Clone,
    {
        self.events.borrow().clone()
    }
}

#[async_trait(?Send)]
impl<W: 'static> UnderlyingSink<W, String> for RecordingSink<W> {
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
        self.events.borrow_mut().push(RecordedEvent::Write(chunk));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), String> {
        self.events.borrow_mut().push(RecordedEvent::Close);
        Ok(())
    }

    async fn abort(&mut self, reason: String) -> Result<(), String> {
        self.events.borrow_mut().push(RecordedEvent::Abort(reason));
        Ok(())
    }
}
