use crate::error::{Error, Result};
use crate::queue::TaskQueue;
use crate::record::{RecordPool, TaskRecord};

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    /// Set once a [`Consumer`] has been created on the current thread.
    ///
    /// Never cleared: a thread gets at most one consumer in its lifetime.
    static CONSUMER_BOUND: Cell<bool> = const { Cell::new(false) };
}

/// Receives the payload-bearing records a [`Consumer`] dequeues.
///
/// Implemented for every `FnMut(&TaskRecord)` closure.
pub trait Handler {
    /// Handles one record that carries no executable.
    fn handle_message(&mut self, record: &TaskRecord);
}

impl<F> Handler for F
where
    F: FnMut(&TaskRecord),
{
    fn handle_message(&mut self, record: &TaskRecord) {
        self(record)
    }
}

/// The dispatch loop of one thread.
///
/// A `Consumer` owns a [`TaskQueue`] and drains it on the thread that created
/// it: due records carrying an [`Executable`](crate::Executable) are run,
/// the others are handed to a [`Handler`]. Each dispatched record is then
/// returned to the queue's pool.
///
/// There is at most one consumer per thread, and it cannot leave that thread.
///
/// # Examples
///
/// ```rust
/// use messenger::{Consumer, Payload, RecordPool};
/// use std::sync::Arc;
///
/// let pool = Arc::new(RecordPool::new());
/// let consumer = Consumer::init(pool.clone()).unwrap();
///
/// let record = pool.acquire().with_payload(Payload::new("hello"));
/// consumer.queue().enqueue(record, 0).unwrap();
/// consumer.stop_safely();
///
/// let mut seen = Vec::new();
/// consumer.start(&mut |record: &messenger::TaskRecord| {
///     seen.push(*record.payload().unwrap().downcast_ref::<&str>().unwrap());
/// });
/// assert_eq!(seen, ["hello"]);
/// ```
pub struct Consumer {
    /// Queue this consumer drains.
    queue: Arc<TaskQueue>,

    /// Keeps the consumer on the thread it was bound to.
    _bound: PhantomData<*const ()>,
}

impl Consumer {
    /// Binds a new consumer, with a fresh queue recycling into `pool`, to the
    /// calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConsumerAlreadyBound`] if this thread already created
    /// a consumer.
    pub fn init(pool: Arc<RecordPool>) -> Result<Self> {
        if CONSUMER_BOUND.with(|bound| bound.replace(true)) {
            tracing::warn!("refusing to bind a second consumer to this thread");
            return Err(Error::ConsumerAlreadyBound);
        }

        tracing::debug!("consumer bound to thread");

        Ok(Self {
            queue: Arc::new(TaskQueue::new(pool)),
            _bound: PhantomData,
        })
    }

    /// Returns `true` if a consumer has been created on the calling thread.
    pub fn is_bound() -> bool {
        CONSUMER_BOUND.with(Cell::get)
    }

    /// The queue producers should enqueue into.
    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Runs the dispatch loop until the queue reports it is done.
    ///
    /// A panic raised by an executable or by `handler` is not caught: it
    /// unwinds out of this call and the in-flight record is dropped instead
    /// of being recycled.
    pub fn start<H>(&self, handler: &mut H)
    where
        H: Handler + ?Sized,
    {
        while let Some(record) = self.queue.next() {
            tracing::trace!(when = record.when(), "dispatching record");

            match record.executable() {
                Some(executable) => executable.run(),
                None => handler.handle_message(&record),
            }

            self.queue.pool().release_unchecked(record);
        }

        tracing::debug!("consumer finished");
    }

    /// Stops the queue, discarding everything still pending.
    pub fn stop(&self) {
        self.queue.stop(false);
    }

    /// Stops the queue, still delivering records that are already due.
    pub fn stop_safely(&self) {
        self.queue.stop(true);
    }
}
