//! # Task abstractions: jobs, identities, records, tickets.
//!
//! This module provides the core task-related types:
//! - [`Job`] - trait for implementing async work units
//! - [`JobFn`] - function-backed job implementation
//! - [`JobRef`] - shared reference to a job (`Arc<dyn Job<T>>`)
//! - [`Outcome`] - a callback's tagged result: settle with a value, or repeat
//! - [`Ticket`] - completion handle resolving when the task settles
//!
//! The crate-internal pieces live here too: [`TaskId`] (the dedup key) and
//! [`Record`] (per-submission state owned by the pending store).

mod identity;
mod job;
mod record;

pub use job::{Job, JobFn, JobRef, Outcome};
pub use record::{SettleResult, Ticket};

pub(crate) use identity::TaskId;
pub(crate) use record::Record;
