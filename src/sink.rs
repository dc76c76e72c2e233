//! The sink contract: an opaque collaborator offering any of
//! `start`/`write`/`close`/`abort`.
//!
//! This crate's own prior art for this exact shape is
//! `tests/writable_stream.rs`'s `UnderlyingSink` trait with
//! `#[async_trait(?Send)]` `NoopSink`/`ConsoleSink` impls, from before the
//! crate moved to binding a JS-side `WritableStream` directly.

use async_trait::async_trait;

use crate::controller::WritableStreamDefaultController;

/// The external consumer of chunks written to a [`WritableStream`].
///
/// All four methods have a default no-op/success implementation except
/// `write`: only `write` is load-bearing for every sink; `start`/
/// `close`/`abort` are genuinely optional.
///
/// [`WritableStream`]: crate::WritableStream
#[async_trait(?Send)]
pub trait UnderlyingSink<W, E> {
    /// Called once during construction, before any chunk is dispatched.
    async fn start(&mut self, _controller: &WritableStreamDefaultController<W, E>) -> Result<(), E> {
        Ok(())
    }

    /// Called at most once at a time, in submission order.
    async fn write(
        &mut self,
        chunk: W,
        controller: &WritableStreamDefaultController<W, E>,
    ) -> Result<(), E>;

    /// Called once, after the last queued chunk has been written.
    async fn close(&mut self) -> Result<(), E> {
        Ok(())
    }

    /// Called at most once, when the stream is aborted. `reason` is
    /// whatever value the caller passed to `abort()`.
    async fn abort(&mut self, _reason: E) -> Result<(), E> {
        Ok(())
    }
}
