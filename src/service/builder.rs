use super::{Service, ServiceThread};
use crate::record::RecordPool;

use std::sync::Arc;

/// Builder for configuring and creating a [`ServiceThread`].
///
/// By default the worker is unnamed, uses the platform's default stack size,
/// and recycles records through [`RecordPool::global`].
///
/// # Examples
///
/// ```rust,ignore
/// let thread = ServiceBuilder::new()
///     .name("indexer")
///     .stack_size(256 * 1024)
///     .build(Indexer::default());
///
/// thread.start()?;
/// ```
#[derive(Default)]
pub struct ServiceBuilder {
    /// Name given to the worker thread.
    name: Option<String>,

    /// Stack size of the worker thread, in bytes.
    stack_size: Option<usize>,

    /// Pool the worker's queue recycles into.
    pool: Option<Arc<RecordPool>>,
}

impl ServiceBuilder {
    /// Creates a `ServiceBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the worker thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the stack size of the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Uses `pool` instead of the process-wide pool.
    ///
    /// Records posted through the built thread are acquired from this pool and
    /// returned to it once dispatched or discarded.
    pub fn pool(mut self, pool: Arc<RecordPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Builds the service thread. Nothing is spawned until
    /// [`ServiceThread::start`] is called.
    pub fn build<S>(self, service: S) -> ServiceThread
    where
        S: Service,
    {
        let pool = self.pool.unwrap_or_else(RecordPool::global);
        ServiceThread::from_parts(self.name, self.stack_size, pool, Box::new(service))
    }
}
