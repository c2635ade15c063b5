use super::TaskRecord;
use crate::error::{Error, Result};

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

/// Number of records a pool keeps for reuse unless configured otherwise.
pub const DEFAULT_POOL_CAPACITY: usize = 50;

/// Process-wide pool shared by every queue that was not given its own.
static GLOBAL_POOL: OnceLock<Arc<RecordPool>> = OnceLock::new();

/// A bounded free list of [`TaskRecord`]s.
///
/// Released records are cleared and kept for reuse up to the pool's capacity;
/// past that they are simply dropped. Acquiring falls back to a fresh
/// allocation when the free list is empty, so the pool never blocks and never
/// runs dry.
///
/// The pool is safe to share between any number of threads: every access goes
/// through a single lock around the free list.
///
/// # Examples
///
/// ```rust
/// use messenger::{Payload, RecordPool};
///
/// let pool = RecordPool::with_capacity(2);
/// let record = pool.acquire().with_payload(Payload::new(7_u32));
///
/// pool.release(record).unwrap();
/// assert_eq!(pool.len(), 1);
///
/// let reused = pool.acquire();
/// assert!(reused.payload().is_none());
/// ```
pub struct RecordPool {
    /// Cleared records waiting to be reused, most recent last.
    free: Mutex<Vec<TaskRecord>>,

    /// Maximum number of records kept in `free`.
    capacity: usize,
}

impl RecordPool {
    /// Creates an empty pool holding at most [`DEFAULT_POOL_CAPACITY`] records.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates an empty pool holding at most `capacity` records.
    ///
    /// A capacity of `0` disables reuse entirely.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Returns the process-wide pool, creating it on first use.
    pub fn global() -> Arc<RecordPool> {
        GLOBAL_POOL
            .get_or_init(|| Arc::new(RecordPool::new()))
            .clone()
    }

    /// Takes a blank record from the free list, or allocates one.
    pub fn acquire(&self) -> TaskRecord {
        let reused = self.free.lock().pop();

        match reused {
            Some(mut record) => {
                record.clear();
                record
            }
            None => TaskRecord::fresh(),
        }
    }

    /// Acquires a record carrying the same executable and payload as `source`.
    ///
    /// The deadline and in-use state are not copied, so the copy can be
    /// enqueued even while `source` is being dispatched.
    pub fn acquire_copy(&self, source: &TaskRecord) -> TaskRecord {
        let mut record = self.acquire();
        record.copy_from(source);

        match source.executable() {
            Some(executable) => record.with_executable(executable.clone()),
            None => record,
        }
    }

    /// Returns a record to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordInUse`] if a queue or a dispatch still owns the
    /// record. The record is dropped in that case.
    pub fn release(&self, record: TaskRecord) -> Result<()> {
        if record.is_in_use() {
            return Err(Error::RecordInUse);
        }

        self.release_unchecked(record);
        Ok(())
    }

    /// Returns a record to the pool without checking its in-use flag.
    ///
    /// This is the path queues use when they discard records they own.
    pub fn release_unchecked(&self, mut record: TaskRecord) {
        record.clear();

        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(record);
            return;
        }
        drop(free);

        tracing::trace!(capacity = self.capacity, "record pool full, dropping record");
    }

    /// Number of records currently waiting for reuse.
    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecordPool {
    fn default() -> Self {
        Self::new()
    }
}
