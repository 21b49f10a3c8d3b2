//! # Queue events emitted by the submission path and the drain loop.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Admission events**: submission, dedup merge
//! - **Lifecycle events**: start, settle, fail, discard, requeue, cancel
//! - **Loop events**: drain loop start/idle, cooperative wait budget
//!
//! The [`Event`] struct carries metadata: queue name, task name, dedup key,
//! a free-form reason, a wall-clock timestamp and a global sequence number.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission events ===
    /// A new task record was inserted into the pending store.
    ///
    /// Sets: `queue`, `task`, `key` (if any), `at`, `seq`.
    TaskSubmitted,

    /// A submission matched an identity already pending; its ticket was
    /// attached to the existing record and no new record was created.
    ///
    /// Sets: `queue`, `task`, `key` (if any), `at`, `seq`.
    TaskDeduplicated,

    // === Task lifecycle events ===
    /// The drain loop popped a record and began executing its callback.
    ///
    /// Sets: `queue`, `task`, `at`, `seq`.
    TaskStarted,

    /// The callback finished and the record settled with a value.
    ///
    /// Sets: `queue`, `task`, `at`, `seq`.
    TaskSettled,

    /// The callback failed (error or panic); the record settled with a
    /// failure. The drain loop continues with the rest of the store.
    ///
    /// Sets: `queue`, `task`, `reason`, `at`, `seq`.
    TaskFailed,

    /// A coalescing record was discarded without running because other
    /// tasks were still waiting behind it. Its ticket resolved `Ok(None)`.
    ///
    /// Sets: `queue`, `task`, `at`, `seq`.
    TaskDiscarded,

    /// The callback returned [`Outcome::Repeat`](crate::Outcome::Repeat);
    /// settlement was deferred and the record re-entered the pending store.
    ///
    /// Sets: `queue`, `task`, `at`, `seq`.
    TaskRequeued,

    /// The queue was shut down while the record was still pending; its
    /// ticket settled with [`TaskError::Canceled`](crate::TaskError::Canceled).
    ///
    /// Sets: `queue`, `task`, `at`, `seq`.
    TaskCanceled,

    // === Loop events ===
    /// A drain loop became active for the queue.
    ///
    /// Sets: `queue`, `at`, `seq`.
    DrainStarted,

    /// The drain loop observed an empty store and went idle.
    ///
    /// Sets: `queue`, `at`, `seq`.
    DrainIdle,

    /// A cooperative wait hit its iteration cap while the host kept
    /// reporting scheduled work (runaway busy-wait guard).
    ///
    /// Sets: `queue`, `task`, `reason` (wait label, if any), `at`, `seq`.
    WaitBudgetExhausted,
}

/// A single queue event with metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event classification.
    pub kind: EventKind,
    /// Queue name, when known.
    pub queue: Option<String>,
    /// Task name, when the event concerns one task.
    pub task: Option<String>,
    /// Caller-supplied dedup key, when the task had one.
    pub key: Option<String>,
    /// Free-form detail (failure message, wait label).
    pub reason: Option<String>,
    /// Wall-clock timestamp taken at construction.
    pub at: SystemTime,
    /// Globally monotonic sequence number.
    pub seq: u64,
}

impl Event {
    /// Creates an event stamped with the current time and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            queue: None,
            task: None,
            key: None,
            reason: None,
            at: SystemTime::now(),
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }

    /// Sets the queue name.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Sets the task name.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Sets the dedup key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the free-form reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
