use super::builder::ServiceBuilder;
use super::consumer::Consumer;
use super::handshake::Handshake;
use crate::error::{Error, Result};
use crate::queue::TaskQueue;
use crate::record::{Executable, Payload, RecordPool, TaskRecord};
use crate::time;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The behavior run by a [`ServiceThread`].
///
/// Both hooks are always called on the service thread itself.
pub trait Service: Send + 'static {
    /// Called once when the thread starts, after its queue is reachable by
    /// producers and before the first record is dispatched.
    fn on_start(&mut self, thread: &ServiceThread);

    /// Called for each dequeued record that carries no executable.
    ///
    /// The default implementation ignores the record.
    fn on_message(&mut self, _record: &TaskRecord) {}
}

/// A dedicated thread with a private, deadline-ordered inbox.
///
/// Other threads hand work to a `ServiceThread` by posting executables or
/// sending records carrying a [`Payload`]; the thread runs them one at a time,
/// earliest deadline first, until it is closed. Records without an executable
/// are delivered to [`Service::on_message`].
///
/// `ServiceThread` is a cheap, cloneable handle: clone it into every thread
/// that needs to talk to the service.
///
/// Every producer-facing operation resolves the worker's queue first. If the
/// thread was never started, or has already exited, the operation fails at
/// once (`false`, or no effect). If the thread is still starting, the
/// operation waits until the queue is published, so work sent right after
/// [`start`](Self::start) is never dropped.
///
/// # Examples
///
/// ```rust
/// use messenger::{Executable, Service, ServiceThread, TaskRecord};
/// use std::sync::mpsc;
///
/// struct Echo(mpsc::Sender<&'static str>);
///
/// impl Service for Echo {
///     fn on_start(&mut self, _thread: &ServiceThread) {}
///
///     fn on_message(&mut self, record: &TaskRecord) {
///         if let Some(text) = record.payload().and_then(|p| p.downcast_ref::<&str>()) {
///             self.0.send(*text).unwrap();
///         }
///     }
/// }
///
/// let (tx, rx) = mpsc::channel();
/// let thread = ServiceThread::new(Echo(tx));
/// thread.start().unwrap();
///
/// let record = TaskRecord::obtain().with_payload(messenger::Payload::new("ping"));
/// assert!(thread.send_message(record).unwrap());
/// assert_eq!(rx.recv().unwrap(), "ping");
///
/// assert!(thread.close_safely());
/// thread.join().unwrap();
/// ```
#[derive(Clone)]
pub struct ServiceThread {
    inner: Arc<Inner>,
}

struct Inner {
    /// Name given to the worker thread.
    name: Option<String>,

    /// Stack size of the worker thread.
    stack_size: Option<usize>,

    /// Pool records are acquired from and recycled into.
    pool: Arc<RecordPool>,

    /// The service, until it moves onto the worker at start.
    service: Mutex<Option<Box<dyn Service>>>,

    /// Publication of the worker's queue.
    handshake: Handshake,

    /// Handle of the worker, until joined.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceThread {
    /// Creates a service thread with default configuration.
    ///
    /// See [`ServiceBuilder`] for naming the thread or choosing its pool.
    pub fn new<S>(service: S) -> Self
    where
        S: Service,
    {
        ServiceBuilder::new().build(service)
    }

    pub(crate) fn from_parts(
        name: Option<String>,
        stack_size: Option<usize>,
        pool: Arc<RecordPool>,
        service: Box<dyn Service>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                stack_size,
                pool,
                service: Mutex::new(Some(service)),
                handshake: Handshake::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The pool records sent to this thread are recycled into.
    pub fn pool(&self) -> &Arc<RecordPool> {
        &self.inner.pool
    }

    /// Spawns the worker thread.
    ///
    /// The worker binds a [`Consumer`], publishes its queue, runs
    /// [`Service::on_start`] and then dispatches records until closed.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if `start` was called before.
    /// - [`Error::Spawn`] if the operating system refused the thread. The
    ///   service is dropped and this handle stays unusable.
    pub fn start(&self) -> Result<()> {
        let Some(service) = self.inner.service.lock().take() else {
            return Err(Error::AlreadyStarted);
        };

        // Held until the handle is stored, so a concurrent `join` never
        // observes a live worker without its handle.
        let mut worker = self.inner.worker.lock();

        if !self.inner.handshake.begin() {
            return Err(Error::AlreadyStarted);
        }

        let mut builder = thread::Builder::new();
        if let Some(name) = &self.inner.name {
            builder = builder.name(name.clone());
        }
        if let Some(size) = self.inner.stack_size {
            builder = builder.stack_size(size);
        }

        let this = self.clone();
        match builder.spawn(move || this.run(service)) {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.inner.handshake.finish();
                tracing::error!(name = ?self.inner.name, %err, "failed to spawn service thread");
                Err(Error::Spawn(err))
            }
        }
    }

    /// Returns `true` while the worker is starting or dispatching.
    pub fn is_alive(&self) -> bool {
        self.inner.handshake.is_alive()
    }

    /// Waits for the worker thread to exit.
    ///
    /// Returns `Ok(())` right away if the thread was never started or has
    /// already been joined. Must not be called from the service thread itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Panicked`] if the worker died from a panic.
    pub fn join(&self) -> Result<()> {
        let Some(handle) = self.inner.worker.lock().take() else {
            return Ok(());
        };

        handle.join().map_err(|_| Error::Panicked)
    }

    /// Stops the thread, discarding every pending record.
    ///
    /// Waits for the worker to finish starting if needed. Returns `false` if
    /// the thread was never started or has already exited.
    pub fn close(&self) -> bool {
        match self.queue() {
            Some(queue) => {
                queue.stop(false);
                true
            }
            None => false,
        }
    }

    /// Stops the thread once the records that are already due have been
    /// dispatched; records due later are discarded.
    ///
    /// Waits for the worker to finish starting if needed. Returns `false` if
    /// the thread was never started or has already exited.
    pub fn close_safely(&self) -> bool {
        match self.queue() {
            Some(queue) => {
                queue.stop(true);
                true
            }
            None => false,
        }
    }

    /// Runs `executable` on this thread as soon as possible.
    pub fn post(&self, executable: Executable) -> bool {
        self.post_at_time(executable, time::now_millis())
    }

    /// Runs `executable` on this thread once `delay` has elapsed.
    pub fn post_delayed(&self, executable: Executable, delay: Duration) -> bool {
        self.post_at_time(executable, time::deadline_after(delay))
    }

    /// Runs `executable` on this thread at `when` on the
    /// [`time`](crate::time) clock.
    pub fn post_at_time(&self, executable: Executable, when: u64) -> bool {
        self.enqueue_fresh(|record| record.with_executable(executable), when)
    }

    /// Runs `executable` on this thread before anything else pending.
    pub fn post_at_front_of_queue(&self, executable: Executable) -> bool {
        self.enqueue_fresh(|record| record.with_executable(executable), 0)
    }

    /// Delivers `record` to [`Service::on_message`] as soon as possible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordInUse`] if the record is owned by a queue or a
    /// dispatch.
    pub fn send_message(&self, record: TaskRecord) -> Result<bool> {
        self.send_message_at_time(record, time::now_millis())
    }

    /// Delivers `record` once `delay` has elapsed.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub fn send_message_delayed(&self, record: TaskRecord, delay: Duration) -> Result<bool> {
        self.send_message_at_time(record, time::deadline_after(delay))
    }

    /// Delivers `record` at `when` on the [`time`](crate::time) clock.
    ///
    /// Returns `Ok(false)` if the thread is not running or is closing; the
    /// record goes back to the pool in that case.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub fn send_message_at_time(&self, record: TaskRecord, when: u64) -> Result<bool> {
        if record.is_in_use() {
            return Err(Error::RecordInUse);
        }

        match self.queue() {
            Some(queue) => queue.enqueue(record, when),
            None => {
                tracing::debug!(name = ?self.inner.name, "service thread not running, dropping record");
                self.inner.pool.release_unchecked(record);
                Ok(false)
            }
        }
    }

    /// Delivers `record` before anything else pending.
    ///
    /// # Errors
    ///
    /// See [`send_message`](Self::send_message).
    pub fn send_message_at_front_of_queue(&self, record: TaskRecord) -> Result<bool> {
        self.send_message_at_time(record, 0)
    }

    /// Delivers a record without payload as soon as possible.
    pub fn send_empty_message(&self) -> bool {
        self.send_empty_message_at_time(time::now_millis())
    }

    /// Delivers a record without payload once `delay` has elapsed.
    pub fn send_empty_message_delayed(&self, delay: Duration) -> bool {
        self.send_empty_message_at_time(time::deadline_after(delay))
    }

    /// Delivers a record without payload at `when`.
    pub fn send_empty_message_at_time(&self, when: u64) -> bool {
        self.enqueue_fresh(|record| record, when)
    }

    /// Removes every pending record.
    pub fn remove_messages(&self) {
        self.remove_callbacks_and_messages(None);
    }

    /// Removes every pending record carrying `payload`.
    pub fn remove_messages_with(&self, payload: &Payload) {
        self.remove_callbacks_and_messages(Some(payload));
    }

    /// Removes every pending record running `executable`.
    pub fn remove_callbacks(&self, executable: &Executable) {
        if let Some(queue) = self.queue() {
            queue.remove_callbacks(executable, None);
        }
    }

    /// Removes every pending record running `executable` with `payload`.
    pub fn remove_callbacks_with(&self, executable: &Executable, payload: &Payload) {
        if let Some(queue) = self.queue() {
            queue.remove_callbacks(executable, Some(payload));
        }
    }

    /// Removes every pending record, executable or not, carrying `payload`.
    ///
    /// `None` removes everything.
    pub fn remove_callbacks_and_messages(&self, payload: Option<&Payload>) {
        if let Some(queue) = self.queue() {
            queue.remove_messages(payload);
        }
    }

    /// Returns `true` if any record is pending.
    pub fn has_messages(&self) -> bool {
        self.queue().is_some_and(|queue| queue.has_messages(None))
    }

    /// Returns `true` if a pending record carries `payload`.
    pub fn has_messages_with(&self, payload: &Payload) -> bool {
        self.queue()
            .is_some_and(|queue| queue.has_messages(Some(payload)))
    }

    /// Returns `true` if a pending record runs `executable`.
    pub fn has_callbacks(&self, executable: &Executable) -> bool {
        self.queue()
            .is_some_and(|queue| queue.has_callbacks(executable, None))
    }

    /// Resolves the worker's queue, waiting while the worker is starting.
    fn queue(&self) -> Option<Arc<TaskQueue>> {
        self.inner.handshake.wait()
    }

    /// Enqueues a record freshly taken from the pool.
    fn enqueue_fresh<F>(&self, prepare: F, when: u64) -> bool
    where
        F: FnOnce(TaskRecord) -> TaskRecord,
    {
        let Some(queue) = self.queue() else {
            tracing::debug!(name = ?self.inner.name, "service thread not running, dropping work");
            return false;
        };

        let record = prepare(self.inner.pool.acquire());
        match queue.enqueue(record, when) {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::error!(%err, "pool handed out a record still in use");
                false
            }
        }
    }

    /// Body of the worker thread.
    fn run(&self, mut service: Box<dyn Service>) {
        let _exit = ExitGuard(self);

        let consumer = match Consumer::init(self.inner.pool.clone()) {
            Ok(consumer) => consumer,
            Err(err) => {
                tracing::error!(name = ?self.inner.name, %err, "failed to bind consumer");
                return;
            }
        };

        self.inner.handshake.publish(consumer.queue().clone());
        tracing::debug!(name = ?self.inner.name, "service thread ready");

        service.on_start(self);
        consumer.start(&mut |record: &TaskRecord| service.on_message(record));
    }
}

impl fmt::Debug for ServiceThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceThread")
            .field("name", &self.inner.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Retires the worker when its body returns or unwinds.
///
/// Producers stop seeing the queue, and whatever is still in it goes back to
/// the pool.
struct ExitGuard<'a>(&'a ServiceThread);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.0.inner;

        if let Some(queue) = inner.handshake.finish() {
            queue.stop(false);
        }

        if thread::panicking() {
            tracing::error!(name = ?inner.name, "service thread terminated by a panic");
        } else {
            tracing::debug!(name = ?inner.name, "service thread exited");
        }
    }
}
