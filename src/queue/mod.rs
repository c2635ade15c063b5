//! Deadline-ordered task queue.
//!
//! This module implements the scheduling primitive underneath every service
//! thread:
//! - [`TaskQueue`]: a lock-guarded set of pending records sorted by deadline,
//!   with a blocking [`next`](TaskQueue::next) for the single consumer and two
//!   stop modes,
//! - `key`: the ordering key that keeps equal deadlines in FIFO order and lets
//!   front-of-queue insertions jump ahead of everything else.

mod key;

pub(crate) mod core;

pub use self::core::TaskQueue;
