//! # Messenger
//!
//! **Messenger** gives a thread a private, time-ordered inbox. Other threads
//! hand it deferred work, either a [`Payload`] for the thread's own handler or
//! an [`Executable`] to run, and the owning thread drains that work strictly in
//! deadline order, on its own control flow, until it is closed.
//!
//! It is built from a few small pieces:
//!
//! - [`TaskRecord`] and [`RecordPool`]: reusable units of work and the bounded
//!   pool that recycles them
//! - [`TaskQueue`]: a deadline-sorted queue with a blocking dequeue and two
//!   stop modes, discard-everything and drain-overdue
//! - [`Consumer`]: the dispatch loop bound to exactly one thread
//! - [`ServiceThread`]: a dedicated thread owning a consumer, reachable from
//!   any other thread through `post`, `send_message`, `remove_*`, `has_*` and
//!   `close`
//!
//! ## Quick Start
//!
//! ```rust
//! use messenger::{Executable, Service, ServiceThread, TaskRecord};
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl Service for Printer {
//!     fn on_start(&mut self, _thread: &ServiceThread) {
//!         println!("printer ready");
//!     }
//!
//!     fn on_message(&mut self, record: &TaskRecord) {
//!         if let Some(text) = record.payload().and_then(|p| p.downcast_ref::<String>()) {
//!             println!("{text}");
//!         }
//!     }
//! }
//!
//! let printer = ServiceThread::new(Printer);
//! printer.start().unwrap();
//!
//! printer.post(Executable::new(|| println!("runs first")));
//! printer
//!     .send_message_delayed(
//!         TaskRecord::obtain().with_payload(messenger::Payload::new("runs later".to_string())),
//!         Duration::from_millis(10),
//!     )
//!     .unwrap();
//!
//! std::thread::sleep(Duration::from_millis(50));
//! printer.close_safely();
//! printer.join().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`time`] — The monotonic millisecond clock deadlines are expressed in

mod error;
mod queue;
mod record;
mod service;

pub mod time;

pub use error::{Error, Result};
pub use queue::TaskQueue;
pub use record::{DEFAULT_POOL_CAPACITY, Executable, Payload, RecordPool, TaskRecord};
pub use service::{Consumer, Handler, Service, ServiceBuilder, ServiceThread};
