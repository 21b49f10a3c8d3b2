//! Queue core: admission, the drain loop, and the execution context.
//!
//! This module contains the embedded implementation of the drainq engine.
//! Public API from this module: [`TaskQueue`], [`QueueBuilder`],
//! [`QueueConfig`], and [`TaskContext`].
//!
//! Internal modules:
//! - [`queue`]: the queue handle, pending store, and admission path;
//! - [`drain`]: sequential and bounded-parallel drain loops;
//! - [`context`]: ambient per-task context and cooperative wait;
//! - [`builder`]: wires bus, subscribers, host, and shutdown token;
//! - [`config`]: width and bus-capacity settings.

mod builder;
mod config;
mod context;
mod drain;
mod queue;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use context::{wait, TaskContext};
pub use queue::TaskQueue;
