//! Error taxonomy: contract violations vs. values that flow out of the
//! sink/abort caller and become `storedError`.

use std::fmt;

/// A synchronous contract violation: brand/lock/state checks that never
/// depend on the sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("stream is already locked to a writer")]
    AlreadyLocked,
    #[error("writer's lock has already been released")]
    LockReleased,
    #[error("stream is not writable")]
    NotWritable,
    #[error("an abort is already pending")]
    AbortPending,
    #[error("close() has already been requested")]
    CloseAlreadyRequested,
    #[error("invalid queuing strategy: {0}")]
    InvalidStrategy(&'static str),
    /// No Rust code ever constructs this variant: `UnderlyingSink` is a
    /// trait, not a duck-typed object with a `type` property, so there is
    /// nothing to brand-check here. Kept for taxonomy parity with
    /// DESIGN.md's grounding notes.
    #[error("underlying sink must not declare a reserved `type`")]
    ReservedSinkType,
    #[error("chunk size must be a non-negative, finite number")]
    InvalidSize,
}

/// What `storedError` can hold once a stream is `errored`.
///
/// `E` is the sink's own error/abort-reason type: the standardized
/// contract treats a sink rejection value and a caller-supplied abort
/// reason as the same kind of opaque value, so this crate does too
/// (see DESIGN.md).
#[derive(Debug, Clone)]
pub enum StreamError<E> {
    /// The sink's `start`, `write` or `close` rejected.
    Sink(E),
    /// The stream was aborted with this reason.
    Aborted(E),
    /// An abort arrived while a close was in flight, and that close went
    /// on to succeed.
    AbortedAfterClose,
    /// The queuing strategy's `size` function returned a NaN, negative,
    /// or non-finite value.
    InvalidSize,
    /// Used only to settle a writer's own `ready`/`closed` signals when
    /// its lock is released — never assigned to `Shared::state`, since
    /// releasing a lock does not error the stream.
    LockReleased,
}

impl<E: fmt::Display> fmt::Display for StreamError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Sink(e) => write!(f, "sink error: {e}"),
            StreamError::Aborted(reason) => write!(f, "stream aborted: {reason}"),
            StreamError::AbortedAfterClose => {
                write!(f, "stream aborted after successfully closing")
            }
            StreamError::InvalidSize => {
                write!(f, "chunk size must be a non-negative, finite number")
            }
            StreamError::LockReleased => write!(f, "writer's lock was released"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for StreamError<E> {}

/// The error type actually returned from the writer-facing surface:
/// either a synchronous contract violation, or the stream's stored
/// error.
#[derive(Debug, Clone)]
pub enum WriterError<E> {
    Contract(ContractError),
    Stream(StreamError<E>),
}

impl<E> From<ContractError> for WriterError<E> {
    fn from(e: ContractError) -> Self {
        WriterError::Contract(e)
    }
}

impl<E> From<StreamError<E>> for WriterError<E> {
    fn from(e: StreamError<E>) -> Self {
        WriterError::Stream(e)
    }
}

impl<E: fmt::Display> fmt::Display for WriterError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::Contract(e) => fmt::Display::fmt(e, f),
            WriterError::Stream(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for WriterError<E> {}
