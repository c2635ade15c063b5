use super::RecordPool;

use std::any::Any;
use std::fmt;
use std::ptr;
use std::sync::Arc;

/// Opaque data carried by a [`TaskRecord`] to the owner's message hook.
///
/// Payloads are compared by identity, not by value: two payloads are the same
/// only if one is a clone of the other. This is what removal and lookup
/// operations such as
/// [`ServiceThread::remove_messages_with`](crate::ServiceThread::remove_messages_with)
/// match on.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    /// Wraps a value into a new payload with a fresh identity.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(value))
    }

    /// Returns the wrapped value if it is of type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let payload = messenger::Payload::new("ping");
    /// assert_eq!(payload.downcast_ref::<&str>(), Some(&"ping"));
    /// assert!(payload.downcast_ref::<u32>().is_none());
    /// ```
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    /// Returns `true` if both payloads share the same identity.
    pub fn same(&self, other: &Payload) -> bool {
        ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A unit of code run directly by the consumer when its record comes due.
///
/// Like [`Payload`], executables are compared by identity. Keep a clone of the
/// executable you post if you want to remove or look it up later.
#[derive(Clone)]
pub struct Executable(Arc<dyn Fn() + Send + Sync>);

impl Executable {
    /// Wraps a closure into a new executable with a fresh identity.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the executable on the calling thread.
    pub fn run(&self) {
        (self.0)()
    }

    /// Returns `true` if both executables share the same identity.
    pub fn same(&self, other: &Executable) -> bool {
        ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Executable")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A reusable unit of deferred work.
///
/// A record carrying an [`Executable`] is dispatched by running it. A record
/// without one is handed to the owning service's message hook, payload or not.
///
/// Records are obtained from a [`RecordPool`] and return to it once
/// dispatched or discarded. The in-use flag is set while a queue or the
/// dispatch loop owns the record; such a record cannot be enqueued again or
/// released through the checked path.
pub struct TaskRecord {
    /// Boxed so that the allocation itself is what the pool recycles.
    slot: Box<Slot>,
}

#[derive(Default)]
struct Slot {
    /// Data delivered to the owner's message hook.
    payload: Option<Payload>,

    /// Code run in place of the message hook.
    executable: Option<Executable>,

    /// Deadline in milliseconds on the [`time`](crate::time) clock.
    when: u64,

    /// Set while a queue or a dispatch owns the record.
    in_use: bool,
}

impl TaskRecord {
    /// Allocates a blank record outside of any pool.
    pub(crate) fn fresh() -> Self {
        Self {
            slot: Box::default(),
        }
    }

    /// Obtains a blank record from the process-wide [`RecordPool::global`].
    pub fn obtain() -> Self {
        RecordPool::global().acquire()
    }

    /// Attaches a payload to this record.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.slot.payload = Some(payload);
        self
    }

    /// Attaches an executable to this record.
    pub fn with_executable(mut self, executable: Executable) -> Self {
        self.slot.executable = Some(executable);
        self
    }

    /// Replaces the payload of this record.
    pub fn set_payload(&mut self, payload: Option<Payload>) {
        self.slot.payload = payload;
    }

    /// Copies the payload of `other` into this record.
    ///
    /// Neither the executable, the deadline nor the in-use state are copied.
    pub fn copy_from(&mut self, other: &TaskRecord) {
        self.slot.payload = other.slot.payload.clone();
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.slot.payload.as_ref()
    }

    pub fn executable(&self) -> Option<&Executable> {
        self.slot.executable.as_ref()
    }

    /// Deadline this record was last enqueued with, `0` for blank records.
    pub fn when(&self) -> u64 {
        self.slot.when
    }

    pub fn is_in_use(&self) -> bool {
        self.slot.in_use
    }

    /// Returns `true` if the record matches an optional payload filter.
    ///
    /// `None` matches every record.
    pub(crate) fn matches_payload(&self, payload: Option<&Payload>) -> bool {
        match payload {
            None => true,
            Some(wanted) => self.payload().is_some_and(|p| p.same(wanted)),
        }
    }

    /// Returns `true` if the record carries `executable` and matches the
    /// optional payload filter.
    pub(crate) fn matches_executable(
        &self,
        executable: &Executable,
        payload: Option<&Payload>,
    ) -> bool {
        self.executable().is_some_and(|e| e.same(executable)) && self.matches_payload(payload)
    }

    pub(crate) fn schedule(&mut self, when: u64) {
        self.slot.in_use = true;
        self.slot.when = when;
    }

    /// Resets every field, leaving a blank record that is not in use.
    pub(crate) fn clear(&mut self) {
        *self.slot = Slot::default();
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("when", &self.slot.when)
            .field("in_use", &self.slot.in_use)
            .field("payload", &self.slot.payload)
            .field("executable", &self.slot.executable)
            .finish()
    }
}
