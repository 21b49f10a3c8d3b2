//! # Job abstraction and function-backed job implementation.
//!
//! This module defines the [`Job`] trait (the async work unit a queue runs)
//! and a convenient function-backed implementation [`JobFn`]. The common
//! handle type is [`JobRef`], an `Arc<dyn Job<T>>` suitable for sharing
//! across submissions.
//!
//! A job receives a [`TaskContext`] it can use to discover its own identity,
//! toggle its cooperative flag, or call the cooperative wait helper.
//!
//! ## Identity
//! When no explicit key is supplied at submission, jobs are deduplicated by
//! the identity of their `Arc` allocation: submitting **the same** `JobRef`
//! twice is a duplicate, submitting two separately-allocated jobs is not.
//! Hold on to the `JobRef` returned by [`JobFn::arc`] if you want dedup.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::TaskContext;
use crate::error::TaskError;

/// Shared handle to a job (`Arc<dyn Job<T>>`).
pub type JobRef<T> = Arc<dyn Job<T>>;

/// What a callback decided about its own settlement.
///
/// Returning [`Outcome::Repeat`] defers settlement: the record is re-inserted
/// into the pending store under its original identity and the callback will
/// be invoked again on a future drain pass. The ticket settles only on a pass
/// that returns [`Outcome::Done`] (or an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Settle the task's ticket with this value.
    Done(T),
    /// Do not settle; requeue the task and run it again later.
    Repeat,
}

impl<T> Outcome<T> {
    /// Returns true for [`Outcome::Repeat`].
    pub fn is_repeat(&self) -> bool {
        matches!(self, Outcome::Repeat)
    }
}

/// # Asynchronous work unit.
///
/// A `Job` has a stable [`name`](Job::name) and an async [`run`](Job::run)
/// method that receives a [`TaskContext`]. The return value decides the
/// settlement: `Ok(Outcome::Done(v))` settles the ticket with `v`,
/// `Ok(Outcome::Repeat)` requeues the task, `Err(e)` settles with a failure.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use drainq::{Job, Outcome, TaskContext, TaskError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Job<u32> for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn run(&self, _ctx: TaskContext) -> Result<Outcome<u32>, TaskError> {
///         // do work...
///         Ok(Outcome::Done(42))
///     }
/// }
/// ```
#[async_trait]
pub trait Job<T>: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Executes one pass of the job.
    async fn run(&self, ctx: TaskContext) -> Result<Outcome<T>, TaskError>;
}

/// Function-backed job implementation.
///
/// Wraps a closure that *creates* a new future per pass, so repeated passes
/// (requeues) never share hidden mutable state; use an explicit `Arc` inside
/// the closure when shared state is wanted.
#[derive(Debug)]
pub struct JobFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> JobFn<F> {
    /// Creates a new function-backed job.
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the job and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use drainq::{JobFn, Outcome, TaskContext, TaskError};
    ///
    /// let job = JobFn::arc("hello", |_ctx: TaskContext| async {
    ///     Ok::<_, TaskError>(Outcome::Done(()))
    /// });
    /// assert_eq!(job.name(), "hello");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Returns the job name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<T, F, Fut> Job<T> for JobFn<F>
where
    T: Send + 'static,
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<Outcome<T>, TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: TaskContext) -> Result<Outcome<T>, TaskError> {
        (self.f)(ctx).await
    }
}
