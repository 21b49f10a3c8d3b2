//! # Ambient per-task execution context and cooperative wait.
//!
//! While a callback executes, a [`TaskContext`] is bound to the dynamic
//! extent of that execution: it is passed into [`Job::run`](crate::Job::run)
//! as a parameter **and** installed in a Tokio task-local, so helper code
//! deep inside a callback can ask "am I inside a task?" via
//! [`TaskContext::current`] without threading the context through every
//! signature. The scope is delimited exactly to the callback future, so
//! nothing leaks across interleaved tasks.
//!
//! ## Cooperative wait
//! [`TaskContext::wait`] lets a long-running callback voluntarily give the
//! host's own work (e.g. rendering) priority over resuming the callback:
//!
//! ```text
//! cooperative flag off ──► one host-yield, return
//! cooperative flag on  ──► while host.has_scheduled_work():
//!                            host-yield, on_tick()        (≤ 5000 iterations)
//!                          one final host-yield
//! ```
//!
//! The iteration cap guards against runaway busy-waiting when the host
//! signal never clears; hitting it publishes a
//! [`WaitBudgetExhausted`](crate::EventKind::WaitBudgetExhausted) event
//! carrying the wait's label.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::{Bus, Event, EventKind};
use crate::host::Host;
use crate::policies::Admission;

/// Hard cap on extra host-yields per cooperative wait.
pub(crate) const WAIT_YIELD_CAP: usize = 5000;

tokio::task_local! {
    static CURRENT: TaskContext;
}

/// Ambient handle bound to one in-flight task.
///
/// Cheap to clone; clones share the cooperative flag.
#[derive(Clone)]
pub struct TaskContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    queue: String,
    task: String,
    key: Option<String>,
    admission: Admission,
    /// Initially true; governs the wait helper's extra-yield behavior.
    cooperative: AtomicBool,
    host: Arc<dyn Host>,
    bus: Bus,
}

impl TaskContext {
    pub(crate) fn new(
        queue: String,
        task: String,
        key: Option<String>,
        admission: Admission,
        host: Arc<dyn Host>,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                queue,
                task,
                key,
                admission,
                cooperative: AtomicBool::new(true),
                host,
                bus,
            }),
        }
    }

    /// Returns the context of the currently executing task, if any.
    ///
    /// Returns `None` when called outside any task's callback.
    pub fn current() -> Option<TaskContext> {
        CURRENT.try_with(|ctx| ctx.clone()).ok()
    }

    /// Installs `ctx` as the ambient context for the extent of `fut`.
    pub(crate) fn scoped<F>(ctx: TaskContext, fut: F) -> impl std::future::Future<Output = F::Output>
    where
        F: std::future::Future,
    {
        CURRENT.scope(ctx, fut)
    }

    /// Name of the queue this task runs on.
    pub fn queue(&self) -> &str {
        &self.inner.queue
    }

    /// Name of the running job.
    pub fn name(&self) -> &str {
        &self.inner.task
    }

    /// Caller-supplied dedup key, if the submission had one.
    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    /// Admission mode of this task.
    pub fn admission(&self) -> Admission {
        self.inner.admission
    }

    /// Reads the per-task cooperative flag (initially `true`).
    pub fn is_cooperative(&self) -> bool {
        self.inner.cooperative.load(Ordering::Relaxed)
    }

    /// Sets the per-task cooperative flag.
    ///
    /// A task can opt out of the extra-yield behavior mid-execution and
    /// opt back in later; the flag only affects subsequent [`wait`] calls.
    ///
    /// [`wait`]: TaskContext::wait
    pub fn set_cooperative(&self, cooperative: bool) {
        self.inner.cooperative.store(cooperative, Ordering::Relaxed);
    }

    /// Cooperative wait with no tick callback and no label.
    ///
    /// See [`TaskContext::wait_with`].
    pub async fn wait(&self) {
        self.wait_with(|| {}, None).await;
    }

    /// Cooperative wait.
    ///
    /// If the task's cooperative flag is off: performs exactly one host-yield
    /// and returns. Otherwise: host-yields and invokes `on_tick` while the
    /// host reports pending scheduled work, up to [`WAIT_YIELD_CAP`]
    /// iterations, then performs one final host-yield.
    ///
    /// `label` identifies this wait site in the event published when the cap
    /// is hit.
    pub async fn wait_with(&self, mut on_tick: impl FnMut(), label: Option<&'static str>) {
        if !self.is_cooperative() {
            self.inner.host.yield_now().await;
            return;
        }

        let mut spent = 0usize;
        while self.inner.host.has_scheduled_work() {
            if spent >= WAIT_YIELD_CAP {
                let mut ev = Event::now(EventKind::WaitBudgetExhausted)
                    .with_queue(self.queue())
                    .with_task(self.name());
                if let Some(label) = label {
                    ev = ev.with_reason(label);
                }
                self.inner.bus.publish(ev);
                break;
            }
            self.inner.host.yield_now().await;
            on_tick();
            spent += 1;
        }
        self.inner.host.yield_now().await;
    }
}

/// Cooperative wait usable from any code path.
///
/// Inside a task this forwards to the ambient context's [`TaskContext::wait`];
/// outside any task it performs a single plain yield.
pub async fn wait() {
    match TaskContext::current() {
        Some(ctx) => ctx.wait().await,
        None => tokio::task::yield_now().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Scripted host: reports scheduled work for a fixed number of queries
    /// and counts yields. Yields are no-ops so tests stay fast.
    struct FakeHost {
        work_remaining: AtomicUsize,
        yields: AtomicUsize,
    }

    impl FakeHost {
        fn with_work(n: usize) -> Arc<Self> {
            Arc::new(Self {
                work_remaining: AtomicUsize::new(n),
                yields: AtomicUsize::new(0),
            })
        }

        fn yields(&self) -> usize {
            self.yields.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Host for FakeHost {
        async fn yield_now(&self) {
            self.yields.fetch_add(1, Ordering::SeqCst);
            let _ = self
                .work_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        }

        fn has_scheduled_work(&self) -> bool {
            self.work_remaining.load(Ordering::SeqCst) > 0
        }
    }

    fn ctx_with_host(host: Arc<dyn Host>) -> TaskContext {
        TaskContext::new(
            "test".into(),
            "demo".into(),
            None,
            Admission::Fifo,
            host,
            Bus::new(8),
        )
    }

    #[tokio::test]
    async fn test_wait_drains_scheduled_work_then_final_yield() {
        let host = FakeHost::with_work(3);
        let ctx = ctx_with_host(host.clone());

        let ticks = AtomicUsize::new(0);
        ctx.wait_with(|| {
            ticks.fetch_add(1, Ordering::SeqCst);
        }, None)
        .await;

        // Three work-draining yields plus the final one.
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(host.yields(), 4);
    }

    #[tokio::test]
    async fn test_non_cooperative_wait_yields_exactly_once() {
        let host = FakeHost::with_work(100);
        let ctx = ctx_with_host(host.clone());
        ctx.set_cooperative(false);

        let ticks = AtomicUsize::new(0);
        ctx.wait_with(|| {
            ticks.fetch_add(1, Ordering::SeqCst);
        }, None)
        .await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert_eq!(host.yields(), 1);
    }

    #[tokio::test]
    async fn test_wait_cap_bounds_runaway_host_signal() {
        // Host that always reports scheduled work.
        let host = FakeHost::with_work(usize::MAX);
        let ctx = ctx_with_host(host.clone());
        let mut rx = ctx.inner.bus.subscribe();

        ctx.wait_with(|| {}, Some("runaway")).await;

        // Cap iterations plus the final yield.
        assert_eq!(host.yields(), WAIT_YIELD_CAP + 1);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::WaitBudgetExhausted);
        assert_eq!(ev.reason.as_deref(), Some("runaway"));
    }

    #[tokio::test]
    async fn test_current_is_scoped_to_the_callback() {
        assert!(TaskContext::current().is_none());

        let ctx = ctx_with_host(Arc::new(crate::host::TokioHost));
        let observed = TaskContext::scoped(ctx, async {
            TaskContext::current().map(|c| c.name().to_string())
        })
        .await;

        assert_eq!(observed.as_deref(), Some("demo"));
        assert!(TaskContext::current().is_none());
    }

    #[tokio::test]
    async fn test_module_wait_outside_task_is_single_yield() {
        // Must not panic and must return promptly.
        super::wait().await;
    }
}
