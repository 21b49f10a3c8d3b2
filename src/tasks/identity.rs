//! # Task identity: the dedup key of a submission.
//!
//! Two submissions with an equal [`TaskId`] are the *same logical task*: the
//! second must not create a second record, it attaches to the existing one.
//!
//! Identity is structural over the identity token and the admission mode:
//! - With an explicit key, the token is the key itself — this is how callers
//!   dedup *distinct* callback closures as one task.
//! - Without a key, the token is the job's `Arc` allocation address. The
//!   pending store keeps the `Arc` alive for as long as the identity is
//!   pending, so an address is never reused while it matters.
//!
//! The queue-instance component of the identity is implicit: each queue owns
//! its own store and identities never leave it.

use std::borrow::Cow;
use std::sync::Arc;

use crate::policies::Admission;
use crate::tasks::job::JobRef;

/// Identity token: explicit key, or callback allocation identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum IdentToken {
    Key(Cow<'static, str>),
    Callback(usize),
}

/// Dedup key for a submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TaskId {
    token: IdentToken,
    admission: Admission,
}

impl TaskId {
    /// Computes the identity of a submission.
    pub(crate) fn of<T>(
        job: &JobRef<T>,
        admission: Admission,
        key: Option<Cow<'static, str>>,
    ) -> Self {
        let token = match key {
            Some(key) => IdentToken::Key(key),
            None => IdentToken::Callback(Arc::as_ptr(job) as *const () as usize),
        };
        Self { token, admission }
    }

    /// The admission mode baked into this identity.
    pub(crate) fn admission(&self) -> Admission {
        self.admission
    }

    /// The caller-supplied key, if the identity carries one.
    pub(crate) fn key(&self) -> Option<&str> {
        match &self.token {
            IdentToken::Key(key) => Some(key),
            IdentToken::Callback(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::job::{JobFn, Outcome};
    use crate::{TaskContext, TaskError};

    fn demo_job(name: &'static str) -> JobRef<()> {
        JobFn::arc(name, |_ctx: TaskContext| async {
            Ok::<_, TaskError>(Outcome::Done(()))
        })
    }

    #[test]
    fn test_same_arc_same_identity() {
        let job = demo_job("a");
        let a = TaskId::of(&job, Admission::Fifo, None);
        let b = TaskId::of(&job.clone(), Admission::Fifo, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_allocations_differ() {
        // Both jobs must stay alive across both computations: a dropped Arc's
        // address may be reused by the next allocation.
        let first = demo_job("a");
        let second = demo_job("a");
        let a = TaskId::of(&first, Admission::Fifo, None);
        let b = TaskId::of(&second, Admission::Fifo, None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_mode_is_part_of_identity() {
        let job = demo_job("a");
        let fifo = TaskId::of(&job, Admission::Fifo, None);
        let coalesce = TaskId::of(&job, Admission::Coalesce, None);
        assert_ne!(fifo, coalesce);
    }

    #[test]
    fn test_key_replaces_callback_identity() {
        let a = TaskId::of(&demo_job("a"), Admission::Fifo, Some("shared".into()));
        let b = TaskId::of(&demo_job("b"), Admission::Fifo, Some("shared".into()));
        assert_eq!(a, b);
        assert_eq!(a.key(), Some("shared"));
    }
}
