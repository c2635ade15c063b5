//! Error types.
//!
//! Only the conditions a caller can do something about are errors. Soft
//! failures such as posting to a stopped queue are reported as `false` by the
//! operations themselves.

use std::io;

use thiserror::Error;

/// Errors produced by records, queues, consumers and service threads.
#[derive(Debug, Error)]
pub enum Error {
    /// [`Consumer::init`](crate::Consumer::init) was called twice on one thread.
    #[error("a consumer is already bound to this thread")]
    ConsumerAlreadyBound,

    /// A record still owned by a queue or a dispatch was released or enqueued.
    #[error("record is still in use")]
    RecordInUse,

    /// [`ServiceThread::start`](crate::ServiceThread::start) was called twice.
    #[error("service thread has already been started")]
    AlreadyStarted,

    /// The operating system refused to spawn the worker thread.
    #[error("failed to spawn service thread: {0}")]
    Spawn(#[from] io::Error),

    /// The worker thread terminated because a dispatched unit panicked.
    #[error("service thread panicked while dispatching")]
    Panicked,
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
