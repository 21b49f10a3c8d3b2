//! # Task records and completion tickets.
//!
//! A [`Record`] is the per-submission mutable state owned by the pending
//! store: the job itself plus one waiter per submission that shares the
//! record's identity. A [`Ticket`] is the caller-facing end of a waiter.
//!
//! ## Lifecycle
//! ```text
//! first submission ──► Record created, inserted into the pending store
//! duplicate        ──► Record::attach (no new record)
//! drain pop        ──► removed from the store; then exactly one of:
//!                        settle(Ok(Some(v)))   value
//!                        settle(Ok(None))      coalescing discard
//!                        settle(Err(e))        callback failure
//!                        requeue               settlement deferred, re-inserted
//! ```
//!
//! ## Rules
//! - Settlement is **exactly once**: `settle` consumes the record, so a
//!   settled record cannot re-enter the store (enforced by the type system,
//!   where the original design needed a runtime assertion).
//! - Every waiter observes the same outcome (the result is cloned per
//!   waiter).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::tasks::job::JobRef;

/// How a task's ticket settles.
///
/// - `Ok(Some(v))` — the callback ran and produced `v`.
/// - `Ok(None)` — the task was a coalescing task discarded without running;
///   this is **not** an error.
/// - `Err(e)` — the callback failed, or the queue shut down first.
pub type SettleResult<T> = Result<Option<T>, TaskError>;

/// Per-submission state stored in the pending store.
pub(crate) struct Record<T> {
    job: JobRef<T>,
    waiters: Vec<oneshot::Sender<SettleResult<T>>>,
}

impl<T: 'static> Record<T> {
    /// Creates a record for a first submission.
    pub(crate) fn new(job: JobRef<T>, waiter: oneshot::Sender<SettleResult<T>>) -> Self {
        Self {
            job,
            waiters: vec![waiter],
        }
    }

    /// Attaches a duplicate submission's waiter to this record.
    pub(crate) fn attach(&mut self, waiter: oneshot::Sender<SettleResult<T>>) {
        self.waiters.push(waiter);
    }

    /// Merges another record's waiters into this one.
    ///
    /// Used when a requeued record finds a duplicate that arrived while it
    /// was executing: both sets of callers must observe the one outcome.
    pub(crate) fn absorb(&mut self, other: Record<T>) {
        self.waiters.extend(other.waiters);
    }

    /// The job this record runs.
    pub(crate) fn job(&self) -> &JobRef<T> {
        &self.job
    }

    /// Convenience: the job's name.
    pub(crate) fn name(&self) -> &str {
        self.job.name()
    }
}

impl<T: Clone + 'static> Record<T> {
    /// Settles every waiter with the same outcome, consuming the record.
    ///
    /// Waiters whose ticket was dropped are skipped silently.
    pub(crate) fn settle(self, result: SettleResult<T>) {
        for waiter in self.waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

/// Completion handle returned by every submission.
///
/// Resolves when the task settles. Duplicate submissions receive tickets
/// attached to the same record and observe the same outcome.
///
/// Dropping a ticket does **not** cancel the task.
#[derive(Debug)]
pub struct Ticket<T> {
    rx: oneshot::Receiver<SettleResult<T>>,
}

impl<T> Ticket<T> {
    pub(crate) fn new(rx: oneshot::Receiver<SettleResult<T>>) -> Self {
        Self { rx }
    }
}

impl<T> Future for Ticket<T> {
    type Output = SettleResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without settling: the queue went away.
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::Canceled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
