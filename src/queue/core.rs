use super::key::{KeySequence, QueueKey};
use crate::error::{Error, Result};
use crate::record::{Executable, Payload, RecordPool, TaskRecord};
use crate::time;

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a [`TaskQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Accepting records.
    Active,

    /// Rejecting records; whatever is left is still handed out.
    Stopping,

    /// The consumer has been told it is done. Terminal.
    Stopped,
}

/// Everything guarded by the queue lock.
struct QueueState {
    /// Pending records, earliest deadline first.
    entries: BTreeMap<QueueKey, TaskRecord>,

    /// Sequence numbers for new keys.
    sequence: KeySequence,

    phase: Phase,
}

/// A deadline-ordered queue of pending [`TaskRecord`]s.
///
/// Any number of producers may [`enqueue`](Self::enqueue) records; exactly one
/// consumer drains them with [`next`](Self::next), which blocks until the
/// earliest record comes due. Records with equal deadlines are handed out in
/// the order they were enqueued, and a deadline of `0` always goes to the head.
///
/// Once [`stop`](Self::stop) has been called the queue rejects new records,
/// and `next` returns `None` as soon as nothing deliverable is left.
///
/// Records the queue discards (removed, rejected, or dropped by a stop) are
/// returned to its [`RecordPool`].
pub struct TaskQueue {
    /// Pending records and lifecycle, under a single lock.
    state: Mutex<QueueState>,

    /// Wakes the consumer on enqueue and stop.
    available: Condvar,

    /// Pool discarded records are returned to.
    pool: Arc<RecordPool>,
}

impl TaskQueue {
    /// Creates an empty, active queue recycling into `pool`.
    pub fn new(pool: Arc<RecordPool>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                entries: BTreeMap::new(),
                sequence: KeySequence::new(),
                phase: Phase::Active,
            }),
            available: Condvar::new(),
            pool,
        }
    }

    /// The pool discarded and dispatched records are returned to.
    pub fn pool(&self) -> &Arc<RecordPool> {
        &self.pool
    }

    /// Schedules `record` for delivery at `when`.
    ///
    /// Returns `Ok(false)` if the queue is stopping; the record is returned to
    /// the pool in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordInUse`] if the record is already owned by a
    /// queue or a dispatch.
    pub fn enqueue(&self, mut record: TaskRecord, when: u64) -> Result<bool> {
        if record.is_in_use() {
            return Err(Error::RecordInUse);
        }

        let mut state = self.state.lock();

        if state.phase != Phase::Active {
            drop(state);

            tracing::debug!(when, "task queue is stopping, rejecting record");
            self.pool.release_unchecked(record);
            return Ok(false);
        }

        record.schedule(when);
        let key = state.sequence.key_for(when);
        state.entries.insert(key, record);
        drop(state);

        self.available.notify_all();
        Ok(true)
    }

    /// Returns the next due record, blocking until one is available.
    ///
    /// The returned record is still marked in use; hand it back with
    /// [`RecordPool::release_unchecked`] once dispatched.
    ///
    /// Returns `None` once the queue has been stopped and nothing deliverable
    /// remains. Every later call returns `None` immediately.
    pub fn next(&self) -> Option<TaskRecord> {
        let mut state = self.state.lock();

        loop {
            let now = time::now_millis();

            if let Some(head) = state.entries.first_entry() {
                if head.key().when <= now {
                    return Some(head.remove());
                }
            }

            if state.phase != Phase::Active {
                state.phase = Phase::Stopped;
                return None;
            }

            match state.entries.first_key_value().map(|(head, _)| head.when) {
                Some(when) => {
                    let timeout = Duration::from_millis(when - now);
                    self.available.wait_for(&mut state, timeout);
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    /// Stops the queue.
    ///
    /// With `drain_overdue` unset every pending record is discarded. With it
    /// set, only records due strictly after now are discarded; the rest are
    /// still handed out by [`next`](Self::next) before it reports the end.
    ///
    /// Calling `stop` again has no effect.
    pub fn stop(&self, drain_overdue: bool) {
        let discarded = {
            let mut state = self.state.lock();

            if state.phase != Phase::Active {
                return;
            }

            state.phase = Phase::Stopping;

            if drain_overdue {
                let boundary = QueueKey::after(time::now_millis());
                state.entries.split_off(&boundary)
            } else {
                mem::take(&mut state.entries)
            }
        };

        self.available.notify_all();

        tracing::debug!(
            drain_overdue,
            discarded = discarded.len(),
            "task queue stopping"
        );
        self.recycle(discarded.into_values());
    }

    /// Removes every record matching the payload filter, wherever it sits.
    ///
    /// `None` removes everything. Returns the number of records removed.
    pub fn remove_messages(&self, payload: Option<&Payload>) -> usize {
        self.remove_where(|record| record.matches_payload(payload))
    }

    /// Removes every record carrying `executable` and matching the payload
    /// filter. Returns the number of records removed.
    pub fn remove_callbacks(&self, executable: &Executable, payload: Option<&Payload>) -> usize {
        self.remove_where(|record| record.matches_executable(executable, payload))
    }

    /// Returns `true` if a pending record matches the payload filter.
    pub fn has_messages(&self, payload: Option<&Payload>) -> bool {
        self.state
            .lock()
            .entries
            .values()
            .any(|record| record.matches_payload(payload))
    }

    /// Returns `true` if a pending record carries `executable` and matches the
    /// payload filter.
    pub fn has_callbacks(&self, executable: &Executable, payload: Option<&Payload>) -> bool {
        self.state
            .lock()
            .entries
            .values()
            .any(|record| record.matches_executable(executable, payload))
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopping(&self) -> bool {
        self.state.lock().phase != Phase::Active
    }

    /// Splices out every matching record, keeping the others in order.
    fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&TaskRecord) -> bool,
    {
        let removed: Vec<TaskRecord> = {
            let mut state = self.state.lock();

            let keys: Vec<QueueKey> = state
                .entries
                .iter()
                .filter_map(|(key, record)| predicate(record).then_some(*key))
                .collect();

            keys.iter()
                .filter_map(|key| state.entries.remove(key))
                .collect()
        };

        let count = removed.len();
        self.recycle(removed);
        count
    }

    /// Returns records the queue owns to the pool.
    ///
    /// Must be called without holding the queue lock.
    fn recycle(&self, records: impl IntoIterator<Item = TaskRecord>) {
        for record in records {
            self.pool.release_unchecked(record);
        }
    }
}
