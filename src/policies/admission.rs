//! # Per-task admission policy
//!
//! Every submission carries an admission mode, and the mode is part of the
//! task's dedup identity: a FIFO submission and a coalescing submission of
//! the same callback are **different** tasks.
//!
//! ## Variants
//! - `Fifo`: the task always eventually runs, exactly once, in submission order.
//! - `Coalesce`: duplicates collapse at submission time; at dequeue time the
//!   task is **discarded** unless it is the last one waiting in the store.
//!
//! ## Invariants
//! - Duplicate submissions never create a second record; they share the
//!   existing record's ticket outcome.
//! - The coalescing discard check is **global**: any other waiting task,
//!   related or not, causes the discard.

/// Policy controlling what happens when the drain loop pops a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Admission {
    /// Run the task exactly once, in FIFO order.
    ///
    /// Use when:
    /// - Every submission must execute
    /// - Order matters
    /// - Example: sequential writes to shared state
    Fifo,

    /// Run the task only if nothing else is waiting when it is popped;
    /// otherwise resolve its ticket with "no value" without running.
    ///
    /// Use when:
    /// - You only care about the latest state
    /// - Redundant work should be avoided
    /// - Example: refreshing a view after a burst of edits
    Coalesce,
}

impl Admission {
    /// Returns true for [`Admission::Coalesce`].
    #[inline]
    pub fn is_coalescing(self) -> bool {
        matches!(self, Admission::Coalesce)
    }
}
