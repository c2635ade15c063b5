use crate::queue::TaskQueue;

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Where a worker stands in publishing its queue.
enum Stage {
    /// The worker has not been spawned.
    Idle,

    /// The worker is spawned but has not published its queue yet.
    Starting,

    /// The queue is published and the worker is dispatching.
    Ready(Arc<TaskQueue>),

    /// The worker exited, or never managed to start. Terminal.
    Finished,
}

/// One-shot publication of a worker's queue to producers.
///
/// The worker publishes exactly once; producers either see the published
/// queue, wait for it while the worker is starting, or get `None` right away
/// when no worker is running.
pub(crate) struct Handshake {
    stage: Mutex<Stage>,

    /// Signalled when the stage leaves `Starting`.
    settled: Condvar,
}

impl Handshake {
    pub(crate) fn new() -> Self {
        Self {
            stage: Mutex::new(Stage::Idle),
            settled: Condvar::new(),
        }
    }

    /// Moves from `Idle` to `Starting`.
    ///
    /// Returns `false` if the handshake had already begun.
    pub(crate) fn begin(&self) -> bool {
        let mut stage = self.stage.lock();

        if !matches!(*stage, Stage::Idle) {
            return false;
        }

        *stage = Stage::Starting;
        true
    }

    /// Publishes the worker's queue and releases every waiting producer.
    pub(crate) fn publish(&self, queue: Arc<TaskQueue>) {
        let mut stage = self.stage.lock();

        if matches!(*stage, Stage::Starting) {
            *stage = Stage::Ready(queue);
        }
        drop(stage);

        self.settled.notify_all();
    }

    /// Marks the worker as gone and returns the queue it had published.
    pub(crate) fn finish(&self) -> Option<Arc<TaskQueue>> {
        let previous = std::mem::replace(&mut *self.stage.lock(), Stage::Finished);
        self.settled.notify_all();

        match previous {
            Stage::Ready(queue) => Some(queue),
            _ => None,
        }
    }

    /// Returns the published queue, waiting for it while the worker starts.
    ///
    /// Returns `None` without blocking if the worker was never started or has
    /// already exited.
    pub(crate) fn wait(&self) -> Option<Arc<TaskQueue>> {
        let mut stage = self.stage.lock();

        while matches!(*stage, Stage::Starting) {
            self.settled.wait(&mut stage);
        }

        match &*stage {
            Stage::Ready(queue) => Some(queue.clone()),
            _ => None,
        }
    }

    /// Returns `true` while a worker is starting or running.
    pub(crate) fn is_alive(&self) -> bool {
        matches!(*self.stage.lock(), Stage::Starting | Stage::Ready(_))
    }
}
