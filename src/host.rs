//! # Host boundary: yield primitive and scheduled-work signal.
//!
//! The queue treats its surrounding run loop as an external collaborator
//! behind the [`Host`] trait:
//! - [`Host::yield_now`] suspends the current logical thread for one tick,
//!   giving the host a chance to process its own pending work. The drain
//!   loop calls it once per iteration so heavy submission bursts never
//!   starve the host.
//! - [`Host::has_scheduled_work`] is a non-blocking hint consumed only by
//!   the cooperative wait helper (see [`TaskContext::wait`](crate::TaskContext::wait)):
//!   while it reports pending work, a cooperative task keeps ceding ticks.
//!
//! The default implementation, [`TokioHost`], yields to the Tokio scheduler
//! and reports no scheduled work. A custom host can be injected through
//! [`QueueBuilder::with_host`](crate::QueueBuilder::with_host); tests use a
//! scripted fake.

use async_trait::async_trait;

/// The queue's view of the surrounding run loop.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Cedes control to the host for one tick (a zero-duration request).
    ///
    /// Must be cooperative: control returns to the host's own loop at least
    /// once, and the caller is resumed without unbounded delay.
    async fn yield_now(&self);

    /// Returns whether the host currently has pending scheduled work
    /// (e.g. a frame waiting to be painted). Must not block.
    fn has_scheduled_work(&self) -> bool;
}

/// Default host backed by the Tokio scheduler.
///
/// `yield_now` re-enqueues the current task at the back of the run queue;
/// `has_scheduled_work` always reports `false`, so cooperative waits reduce
/// to a single yield.
#[derive(Default, Debug, Clone, Copy)]
pub struct TokioHost;

#[async_trait]
impl Host for TokioHost {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }

    fn has_scheduled_work(&self) -> bool {
        false
    }
}
