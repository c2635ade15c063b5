//! Service threads and their dispatch loop.
//!
//! This module contains:
//! - [`consumer`]: the per-thread dispatch loop draining a task queue,
//! - [`handshake`]: the one-shot publication of a worker's queue,
//! - [`core`]: the [`ServiceThread`] handle and the [`Service`] hooks,
//! - [`builder`]: configuration of new service threads.

pub(crate) mod builder;
pub(crate) mod consumer;
pub(crate) mod core;
pub(crate) mod handshake;

pub use self::builder::ServiceBuilder;
pub use self::consumer::{Consumer, Handler};
pub use self::core::{Service, ServiceThread};
