//! A single-writer, backpressure-aware writable chunk stream core.
//!
//! Wraps a caller-supplied [`UnderlyingSink`] behind a [`WritableStream`]:
//! a producer acquires its one [`WritableStreamDefaultWriter`], writes
//! chunks, and closes or aborts, while a background task serially
//! dispatches each chunk to the sink and tracks backpressure against a
//! [`QueuingStrategy`].
//!
//! Every [`WritableStream`] must be constructed from within a running
//! [`tokio::task::LocalSet`]: the dispatch loop is spawned with
//! [`tokio::task::spawn_local`], since the core is deliberately `!Send` —
//! there is exactly one writer at a time, so nothing here needs to cross
//! threads.

pub use controller::WritableStreamDefaultController;
pub use error::{ContractError, StreamError, WriterError};
pub use sink::UnderlyingSink;
pub use strategy::QueuingStrategy;
pub use stream::WritableStream;
pub use writer::WritableStreamDefaultWriter;

mod controller;
mod error;
mod queue;
mod shared;
mod signal;
mod sink;
mod strategy;
mod stream;
mod writer;
