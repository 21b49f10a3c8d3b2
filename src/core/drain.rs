//! # Drain loop: sequential and bounded-parallel draining.
//!
//! At most one drain loop is active per queue. It pops the head of the
//! pending store in FIFO order and applies the admission policy:
//!
//! ```text
//! loop {
//!   ├─► host-yield once        (fairness: never starve the host of a tick)
//!   ├─► pop head, note is_last (store empty after the pop?)
//!   ├─► Fifo, or Coalesce when is_last ─► execute
//!   │         │
//!   │         ├─ Ok(Done(v))  ─► settle Ok(Some(v)), publish TaskSettled
//!   │         ├─ Ok(Repeat)   ─► re-insert record, publish TaskRequeued
//!   │         └─ Err(e)/panic ─► settle Err(e), publish TaskFailed, keep going
//!   │
//!   └─► Coalesce, not last    ─► settle Ok(None), publish TaskDiscarded
//! }
//! ```
//!
//! ## Rules
//! - The loop clears the drain-active flag under the same lock that observes
//!   the store empty, so a later submission re-triggers exactly one loop.
//! - Width 1 awaits each task inline; width > 1 launches up to `channels`
//!   tasks with **distinct** identities into an in-flight set and blocks on
//!   "any one finishes" when the set is full or the store is empty.
//! - Within one identity execution is strictly sequential: a popped record
//!   whose identity is still in flight (requeue window) goes back to the
//!   head of the store until the running pass completes.
//! - A callback failure or panic settles that record only; the loop always
//!   continues with the rest of the store.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

use crate::core::context::TaskContext;
use crate::core::queue::Inner;
use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::tasks::{Outcome, Record, TaskId};

/// Spawns a drain loop for the queue. The caller must have set the
/// drain-active flag while holding the state lock.
pub(crate) fn spawn<T: Clone + Send + 'static>(inner: Arc<Inner<T>>) {
    tokio::spawn(run(inner));
}

async fn run<T: Clone + Send + 'static>(inner: Arc<Inner<T>>) {
    inner
        .bus
        .publish(Event::now(EventKind::DrainStarted).with_queue(inner.name.as_ref()));

    if inner.cfg.channels_clamped() == 1 {
        drain_sequential(&inner).await;
    } else {
        drain_parallel(&inner, inner.cfg.channels_clamped()).await;
    }

    inner
        .bus
        .publish(Event::now(EventKind::DrainIdle).with_queue(inner.name.as_ref()));
}

/// Width = 1: strictly sequential FIFO draining.
async fn drain_sequential<T: Clone + Send + 'static>(inner: &Arc<Inner<T>>) {
    loop {
        if inner.shutdown.is_cancelled() {
            cancel_pending(inner);
            break;
        }
        inner.host.yield_now().await;

        let Some((id, record, is_last)) = pop_head(inner) else {
            break;
        };
        if id.admission().is_coalescing() && !is_last {
            discard(inner, record);
            continue;
        }
        execute(inner, id, record).await;
    }
}

/// Width > 1: bounded-parallel draining over distinct identities.
async fn drain_parallel<T: Clone + Send + 'static>(inner: &Arc<Inner<T>>, width: usize) {
    let mut in_flight: FuturesUnordered<BoxFuture<'static, TaskId>> = FuturesUnordered::new();
    let mut executing: HashSet<TaskId> = HashSet::new();

    loop {
        if inner.shutdown.is_cancelled() {
            // Dropping the in-flight set drops its records' waiters, which
            // resolves their tickets as canceled.
            cancel_pending(inner);
            break;
        }
        inner.host.yield_now().await;

        match next_step(inner, in_flight.len(), width) {
            Step::Exit => break,
            Step::WaitOne => {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => {}
                    done = in_flight.next() => {
                        if let Some(id) = done {
                            executing.remove(&id);
                        }
                    }
                }
            }
            Step::Pop(id, record, is_last) => {
                if id.admission().is_coalescing() && !is_last {
                    discard(inner, record);
                    continue;
                }
                if executing.contains(&id) {
                    // Same identity still running (requeue window): put the
                    // record back at the head and wait for a completion
                    // before trying again.
                    push_front(inner, id, record);
                    if let Some(done) = in_flight.next().await {
                        executing.remove(&done);
                    }
                    continue;
                }

                let fresh = executing.insert(id.clone());
                debug_assert!(fresh, "task identity launched twice");

                let task = {
                    let inner = Arc::clone(inner);
                    let id = id.clone();
                    async move {
                        execute(&inner, id.clone(), record).await;
                        id
                    }
                };
                in_flight.push(Box::pin(task));
            }
        }
    }
}

enum Step<T> {
    /// Store empty and nothing in flight: the loop is done.
    Exit,
    /// Cannot pop right now: block until any in-flight task finishes.
    WaitOne,
    /// Head record popped; bool is "store now empty".
    Pop(TaskId, Record<T>, bool),
}

/// Decides the loop's next move under one lock acquisition.
fn next_step<T: 'static>(inner: &Inner<T>, in_flight: usize, width: usize) -> Step<T> {
    let mut st = inner.state.lock();
    if st.pending.is_empty() {
        if in_flight == 0 {
            st.draining = false;
            return Step::Exit;
        }
        return Step::WaitOne;
    }
    if in_flight >= width {
        return Step::WaitOne;
    }
    match st.pending.shift_remove_index(0) {
        Some((id, record)) => {
            let is_last = st.pending.is_empty();
            Step::Pop(id, record, is_last)
        }
        None => Step::WaitOne,
    }
}

/// Pops the head for the sequential loop; clears the drain-active flag
/// (still under the lock) when the store is empty.
fn pop_head<T: 'static>(inner: &Inner<T>) -> Option<(TaskId, Record<T>, bool)> {
    let mut st = inner.state.lock();
    match st.pending.shift_remove_index(0) {
        Some((id, record)) => {
            let is_last = st.pending.is_empty();
            Some((id, record, is_last))
        }
        None => {
            st.draining = false;
            None
        }
    }
}

/// Executes one pass of a record's callback and applies the settlement.
async fn execute<T: Clone + Send + 'static>(inner: &Arc<Inner<T>>, id: TaskId, record: Record<T>) {
    let ctx = TaskContext::new(
        inner.name.to_string(),
        record.name().to_string(),
        id.key().map(str::to_string),
        id.admission(),
        Arc::clone(&inner.host),
        inner.bus.clone(),
    );

    inner.bus.publish(
        Event::now(EventKind::TaskStarted)
            .with_queue(inner.name.as_ref())
            .with_task(record.name()),
    );

    let job = Arc::clone(record.job());
    let pass = TaskContext::scoped(ctx.clone(), async move { job.run(ctx).await });
    let result = match AssertUnwindSafe(pass).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(TaskError::fail("task panicked")),
    };

    match result {
        Ok(Outcome::Done(value)) => {
            inner.bus.publish(
                Event::now(EventKind::TaskSettled)
                    .with_queue(inner.name.as_ref())
                    .with_task(record.name()),
            );
            record.settle(Ok(Some(value)));
        }
        Ok(Outcome::Repeat) => {
            inner.bus.publish(
                Event::now(EventKind::TaskRequeued)
                    .with_queue(inner.name.as_ref())
                    .with_task(record.name()),
            );
            requeue(inner, id, record);
        }
        Err(err) => {
            inner.bus.publish(
                Event::now(EventKind::TaskFailed)
                    .with_queue(inner.name.as_ref())
                    .with_task(record.name())
                    .with_reason(err.as_message()),
            );
            record.settle(Err(err));
        }
    }
}

/// Re-inserts a requeued record under its original identity.
///
/// If a duplicate submission arrived while the record was executing, the
/// duplicate's (earlier) store position wins and the waiter lists merge.
fn requeue<T: 'static>(inner: &Inner<T>, id: TaskId, record: Record<T>) {
    let mut st = inner.state.lock();
    match st.pending.entry(id) {
        indexmap::map::Entry::Occupied(mut entry) => entry.get_mut().absorb(record),
        indexmap::map::Entry::Vacant(entry) => {
            entry.insert(record);
        }
    }
}

/// Puts a popped record back at the head of the store.
fn push_front<T: 'static>(inner: &Inner<T>, id: TaskId, record: Record<T>) {
    let mut st = inner.state.lock();
    if let Some(existing) = st.pending.get_mut(&id) {
        // A duplicate slipped in between pop and push-back; merge into it.
        existing.absorb(record);
    } else {
        st.pending.shift_insert(0, id, record);
    }
}

/// Settles a coalescing record with "no value" without running it.
fn discard<T: Clone + 'static>(inner: &Inner<T>, record: Record<T>) {
    inner.bus.publish(
        Event::now(EventKind::TaskDiscarded)
            .with_queue(inner.name.as_ref())
            .with_task(record.name()),
    );
    record.settle(Ok(None));
}

/// Shutdown path: clears the flag and cancels everything still pending.
fn cancel_pending<T: Clone + 'static>(inner: &Inner<T>) {
    let canceled: Vec<(TaskId, Record<T>)> = {
        let mut st = inner.state.lock();
        st.draining = false;
        st.pending.drain(..).collect()
    };
    for (_, record) in canceled {
        inner.bus.publish(
            Event::now(EventKind::TaskCanceled)
                .with_queue(inner.name.as_ref())
                .with_task(record.name()),
        );
        record.settle(Err(TaskError::Canceled));
    }
}
