//! Units of deferred work and their recycling pool.
//!
//! This module contains:
//! - [`TaskRecord`]: one unit of work, carrying a [`Payload`] for the owner's
//!   handler or an [`Executable`] to run directly, plus its deadline,
//! - [`RecordPool`]: a bounded free list that lets records be reused instead
//!   of reallocated for every message.
//!
//! A record is always owned by exactly one place at a time: the caller, a
//! queue, the dispatch loop, or the pool's free list.

mod core;
mod pool;

pub use self::core::{Executable, Payload, TaskRecord};
pub use pool::{DEFAULT_POOL_CAPACITY, RecordPool};
