//! # The task queue: admission, dedup, and drain triggering.
//!
//! [`TaskQueue`] serializes (or bounds the concurrency of) async work units
//! submitted by many callers. Submissions flow through one admission path:
//!
//! ```text
//! caller ──► TaskId computed ──► pending store (insert-or-attach)
//!                                     │
//!                                     ▼
//!                           drain loop (started if idle)
//! ```
//!
//! ## Rules
//! - The pending store is an insertion-ordered map (`TaskId` → record): FIFO
//!   iteration with O(1) dedup lookup. A duplicate submission attaches to
//!   the existing record and does **not** change its position.
//! - At most one drain loop is active per queue; triggering while one is
//!   active is a no-op (the active loop picks up new records).
//! - The store and the drain-active flag live under one short-lived lock;
//!   no `.await` ever happens while it is held.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::OnceLock;

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::config::QueueConfig;
use crate::core::{builder::QueueBuilder, drain};
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::host::Host;
use crate::policies::Admission;
use crate::tasks::{JobRef, Record, SettleResult, TaskId, Ticket};

/// Process-wide default queue, created on first access.
static GLOBAL: OnceLock<TaskQueue<()>> = OnceLock::new();

/// A single-consumer task queue with FIFO and coalescing admission.
///
/// Cheap to clone; clones share the same pending store and drain loop.
///
/// ## Example
/// ```
/// use drainq::{JobFn, Outcome, QueueConfig, TaskContext, TaskError, TaskQueue};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let queue: TaskQueue<u32> = TaskQueue::builder(QueueConfig::default())
///         .with_name("demo")
///         .build();
///
///     let job = JobFn::arc("answer", |_ctx: TaskContext| async {
///         Ok::<_, TaskError>(Outcome::Done(42))
///     });
///
///     let ticket = queue.submit(job);
///     assert_eq!(ticket.await, Ok(Some(42)));
/// }
/// ```
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Shared queue state. The drain loop holds its own `Arc` of this.
pub(crate) struct Inner<T> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) cfg: QueueConfig,
    pub(crate) bus: Bus,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) state: Mutex<State<T>>,
}

/// Store + drain-active flag, guarded together so the "loop exits exactly
/// when the store is empty" handoff is race-free.
pub(crate) struct State<T> {
    pub(crate) pending: IndexMap<TaskId, Record<T>>,
    pub(crate) draining: bool,
}

impl<T: Clone + Send + 'static> TaskQueue<T> {
    /// Starts building a queue with the given configuration.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder<T> {
        QueueBuilder::new(cfg)
    }

    /// Creates a queue with the given configuration and no subscribers.
    pub fn new(cfg: QueueConfig) -> Self {
        Self::builder(cfg).build()
    }

    pub(crate) fn from_parts(
        name: Cow<'static, str>,
        cfg: QueueConfig,
        bus: Bus,
        host: Arc<dyn Host>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                cfg,
                bus,
                host,
                shutdown,
                state: Mutex::new(State {
                    pending: IndexMap::new(),
                    draining: false,
                }),
            }),
        }
    }

    /// Submits a FIFO task.
    ///
    /// The task always eventually runs, exactly once per settlement, in
    /// submission order (within its lane). The returned ticket resolves
    /// with `Ok(Some(value))` or the callback's failure.
    pub fn submit(&self, job: JobRef<T>) -> Ticket<T> {
        self.admit(job, Admission::Fifo, None)
    }

    /// Submits a FIFO task deduplicated by an explicit key.
    ///
    /// Distinct closures submitted under the same key are the same logical
    /// task: later submissions attach to the pending record and the stored
    /// (first) callback is the one that runs.
    pub fn submit_keyed(&self, job: JobRef<T>, key: impl Into<Cow<'static, str>>) -> Ticket<T> {
        self.admit(job, Admission::Fifo, Some(key.into()))
    }

    /// Submits a coalescing task.
    ///
    /// The task may be discarded without running: when the drain loop pops
    /// it and **any** other task is still waiting in the store, the ticket
    /// resolves `Ok(None)` and the callback is never invoked. If it is the
    /// last task waiting, it runs normally.
    pub fn submit_coalescing(&self, job: JobRef<T>) -> Ticket<T> {
        self.admit(job, Admission::Coalesce, None)
    }

    /// Submits a coalescing task deduplicated by an explicit key.
    pub fn submit_coalescing_keyed(
        &self,
        job: JobRef<T>,
        key: impl Into<Cow<'static, str>>,
    ) -> Ticket<T> {
        self.admit(job, Admission::Coalesce, Some(key.into()))
    }

    /// Returns true when the pending store is empty.
    ///
    /// Tasks currently executing are not counted.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().pending.is_empty()
    }

    /// Number of tasks waiting in the pending store.
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// The queue's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Shuts the queue down.
    ///
    /// The drain loop stops at its next checkpoint; every still-pending
    /// record settles with [`TaskError::Canceled`]. Later submissions
    /// settle with `Canceled` immediately. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let canceled: Vec<(TaskId, Record<T>)> = {
            let mut st = self.inner.state.lock();
            st.pending.drain(..).collect()
        };
        for (_, record) in canceled {
            self.inner.bus.publish(
                Event::now(EventKind::TaskCanceled)
                    .with_queue(self.inner.name.as_ref())
                    .with_task(record.name()),
            );
            record.settle(Err(TaskError::Canceled));
        }
    }

    /// Admission path shared by all four submit operations.
    fn admit(&self, job: JobRef<T>, admission: Admission, key: Option<Cow<'static, str>>) -> Ticket<T> {
        let (tx, rx) = oneshot::channel::<SettleResult<T>>();

        if self.inner.shutdown.is_cancelled() {
            let _ = tx.send(Err(TaskError::Canceled));
            return Ticket::new(rx);
        }

        let id = TaskId::of(&job, admission, key);
        let key_str = id.key().map(str::to_string);
        let task_name = job.name().to_string();

        let (kind, start) = {
            let mut st = self.inner.state.lock();
            let kind = match st.pending.entry(id) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().attach(tx);
                    EventKind::TaskDeduplicated
                }
                Entry::Vacant(entry) => {
                    entry.insert(Record::new(job, tx));
                    EventKind::TaskSubmitted
                }
            };
            let start = if st.draining {
                false
            } else {
                st.draining = true;
                true
            };
            (kind, start)
        };

        let mut ev = Event::now(kind)
            .with_queue(self.inner.name.as_ref())
            .with_task(task_name);
        if let Some(key) = key_str {
            ev = ev.with_key(key);
        }
        self.inner.bus.publish(ev);

        if start {
            drain::spawn(Arc::clone(&self.inner));
        }
        Ticket::new(rx)
    }

    #[cfg(test)]
    pub(crate) fn is_draining(&self) -> bool {
        self.inner.state.lock().draining
    }
}

impl TaskQueue<()> {
    /// The process-wide default queue (width 1, no subscribers).
    ///
    /// Lazily initialized on first access; never torn down before process
    /// exit. Prefer passing a queue explicitly where feasible, keeping this
    /// as a convenience accessor.
    pub fn global() -> TaskQueue<()> {
        GLOBAL
            .get_or_init(|| {
                TaskQueue::builder(QueueConfig::default())
                    .with_name("default")
                    .build()
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::TaskContext;
    use crate::tasks::{JobFn, Outcome};
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn queue(channels: usize) -> TaskQueue<u32> {
        TaskQueue::builder(QueueConfig::with_channels(channels))
            .with_name("test")
            .build()
    }

    fn value_job(name: &'static str, value: u32) -> JobRef<u32> {
        JobFn::arc(name, move |_ctx: TaskContext| async move {
            Ok::<_, TaskError>(Outcome::Done(value))
        })
    }

    /// Waits for the drain loop to go idle after the store empties.
    async fn settle_loop<T: Clone + Send + 'static>(q: &TaskQueue<T>) {
        for _ in 0..100 {
            if q.is_empty() && !q.is_draining() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("drain loop never went idle");
    }

    #[tokio::test]
    async fn test_fifo_order_is_submission_order() {
        let q = queue(1);
        let log = Arc::new(PlMutex::new(Vec::new()));

        let mut tickets = Vec::new();
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            tickets.push(q.submit(JobFn::arc(tag, move |_ctx: TaskContext| {
                let log = log.clone();
                async move {
                    log.lock().push(tag);
                    Ok::<_, TaskError>(Outcome::Done(0))
                }
            })));
        }
        for t in tickets {
            assert_eq!(t.await, Ok(Some(0)));
        }
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_submission_executes_once() {
        let q = queue(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let job: JobRef<u32> = {
            let runs = runs.clone();
            JobFn::arc("dup", move |_ctx: TaskContext| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(Outcome::Done(5))
                }
            })
        };

        // Both submitted before the drain loop gets a chance to run
        // (current-thread runtime, no await in between).
        let first = q.submit(job.clone());
        let second = q.submit(job);

        assert_eq!(first.await, Ok(Some(5)));
        assert_eq!(second.await, Ok(Some(5)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_keyed_dedup_across_distinct_closures() {
        let q = queue(1);
        let runs = Arc::new(AtomicUsize::new(0));

        let make = |value: u32| {
            let runs = runs.clone();
            JobFn::arc("keyed", move |_ctx: TaskContext| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(Outcome::Done(value))
                }
            })
        };

        let first = q.submit_keyed(make(1), "same-task");
        let second = q.submit_keyed(make(2), "same-task");

        // The stored (first) callback is the one that runs; both tickets
        // observe its outcome.
        assert_eq!(first.await, Ok(Some(1)));
        assert_eq!(second.await, Ok(Some(1)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_coalescing_task_discarded_when_not_last() {
        let q = queue(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let coalesced = {
            let ran = ran.clone();
            q.submit_coalescing(JobFn::arc("stale", move |_ctx: TaskContext| {
                let ran = ran.clone();
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(Outcome::Done(1))
                }
            }))
        };
        let fresh = q.submit(value_job("fresh", 2));

        assert_eq!(coalesced.await, Ok(None));
        assert_eq!(fresh.await, Ok(Some(2)));
        assert_eq!(ran.load(Ordering::SeqCst), 0, "discarded callback must not run");
    }

    #[tokio::test]
    async fn test_coalescing_task_runs_when_alone() {
        let q = queue(1);
        let ticket = q.submit_coalescing(value_job("solo", 9));
        assert_eq!(ticket.await, Ok(Some(9)));
    }

    #[tokio::test]
    async fn test_bounded_parallelism_never_exceeds_width() {
        let q = queue(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tickets = Vec::new();
        for i in 0..5u32 {
            let current = current.clone();
            let peak = peak.clone();
            // Distinct allocations → distinct identities → parallel lanes.
            tickets.push(q.submit(JobFn::arc("lane", move |_ctx: TaskContext| {
                let current = current.clone();
                let peak = peak.clone();
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(Outcome::Done(i))
                }
            })));
        }
        for t in tickets {
            assert!(t.await.is_ok());
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_requeue_defers_settlement_until_done() {
        let q = queue(1);
        let runs = Arc::new(AtomicUsize::new(0));

        let ticket = {
            let runs = runs.clone();
            q.submit(JobFn::arc("retry", move |_ctx: TaskContext| {
                let runs = runs.clone();
                async move {
                    let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Ok::<_, TaskError>(Outcome::Repeat)
                    } else {
                        Ok(Outcome::Done(n as u32))
                    }
                }
            }))
        };

        assert_eq!(ticket.await, Ok(Some(3)));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_settles_locally_and_drain_continues() {
        let q = queue(1);

        let failing = q.submit(JobFn::arc("bad", |_ctx: TaskContext| async {
            Err::<Outcome<u32>, _>(TaskError::fail("boom"))
        }));
        let healthy = q.submit(value_job("good", 7));

        assert_eq!(failing.await, Err(TaskError::fail("boom")));
        assert_eq!(healthy.await, Ok(Some(7)));
    }

    #[tokio::test]
    async fn test_panicking_callback_becomes_failure() {
        let q = queue(1);

        let panicking = q.submit(JobFn::arc("panic", |_ctx: TaskContext| async {
            panic!("kaboom");
            #[allow(unreachable_code)]
            Ok::<_, TaskError>(Outcome::Done(0u32))
        }));
        let healthy = q.submit(value_job("good", 7));

        assert!(matches!(panicking.await, Err(TaskError::Fail { .. })));
        assert_eq!(healthy.await, Ok(Some(7)));
    }

    #[tokio::test]
    async fn test_idle_queue_has_no_active_drain_loop() {
        let q = queue(1);
        assert!(q.is_empty());
        assert!(!q.is_draining());

        let ticket = q.submit(value_job("once", 1));
        assert_eq!(ticket.await, Ok(Some(1)));

        settle_loop(&q).await;
        assert!(q.is_empty());
        assert!(!q.is_draining());

        // A fresh submission re-triggers a loop and drains again.
        let ticket = q.submit(value_job("again", 2));
        assert_eq!(ticket.await, Ok(Some(2)));
    }

    #[tokio::test]
    async fn test_context_reports_task_identity() {
        let q = queue(1);
        let ticket = q.submit_keyed(
            JobFn::arc("who-am-i", |ctx: TaskContext| async move {
                assert_eq!(ctx.name(), "who-am-i");
                assert_eq!(ctx.key(), Some("k1"));
                assert!(ctx.admission() == crate::policies::Admission::Fifo);
                assert!(TaskContext::current().is_some());
                Ok::<_, TaskError>(Outcome::Done(0u32))
            }),
            "k1",
        );
        assert_eq!(ticket.await, Ok(Some(0)));
        assert!(TaskContext::current().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_and_later_submissions() {
        let q = queue(1);
        q.shutdown();

        let ticket = q.submit(value_job("late", 1));
        assert_eq!(ticket.await, Err(TaskError::Canceled));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_per_identity_sequencing_with_width() {
        // A requeueing task must never run two passes concurrently, even
        // with spare lanes.
        let q = queue(4);
        let active = Arc::new(AtomicUsize::new(0));
        let passes = Arc::new(AtomicUsize::new(0));

        let ticket = {
            let active = active.clone();
            let passes = passes.clone();
            q.submit(JobFn::arc("strict-lane", move |_ctx: TaskContext| {
                let active = active.clone();
                let passes = passes.clone();
                async move {
                    assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    let n = passes.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Ok::<_, TaskError>(Outcome::Repeat)
                    } else {
                        Ok(Outcome::Done(n as u32))
                    }
                }
            }))
        };

        assert_eq!(ticket.await, Ok(Some(3)));
        assert_eq!(passes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_global_queue_is_shared() {
        let a = TaskQueue::global();
        let b = TaskQueue::global();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.name(), "default");
    }
}
