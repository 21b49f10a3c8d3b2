//! Error types used by the drainq queue and its tasks.
//!
//! There is a single error enum, [`TaskError`], describing why a task's
//! completion ticket settled with a failure. Failures are local to one
//! task's ticket: a failing callback never stops the drain loop, and a
//! coalescing discard is **not** an error (the ticket resolves with
//! `Ok(None)`).
//!
//! The type provides helper methods (`as_label`, `as_message`) for
//! logging/metrics, mirroring the short stable labels carried by events.

use thiserror::Error;

/// # Errors produced by task execution.
///
/// These settle a task's [`Ticket`](crate::Ticket) with a failure. The enum
/// is `Clone` because one failure settles every ticket attached to the same
/// deduplicated record.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task's callback failed (returned an error or panicked).
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The queue was shut down (or dropped) before the task settled.
    #[error("queue closed before the task settled")]
    Canceled,
}

impl TaskError {
    /// Creates a [`TaskError::Fail`] from any displayable error.
    ///
    /// # Example
    /// ```
    /// use drainq::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use drainq::TaskError;
    ///
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "queue closed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_carries_message() {
        let err = TaskError::fail("boom");
        assert_eq!(err.as_label(), "task_failed");
        assert!(err.as_message().contains("boom"));
    }

    #[test]
    fn test_canceled_label() {
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    }
}
