//! Deadline clock.
//!
//! Deadlines are plain `u64` milliseconds measured from a process-wide
//! origin. The clock starts at `1`: a deadline of `0` is reserved for
//! "front of the queue" and is always due.

mod clock;

#[doc(inline)]
pub use clock::{deadline_after, now_millis};
