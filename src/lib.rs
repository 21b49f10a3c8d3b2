//! # drainq
//!
//! **drainq** is a single-consumer async task queue for Rust.
//!
//! It serializes (or bounds the concurrency of) asynchronous work units
//! submitted by many callers, protecting shared mutable state that async
//! callbacks touch and capping how much concurrent work is outstanding.
//! Two admission policies are provided: strict FIFO execution, and
//! "keep only the freshest" coalescing for tasks whose identity repeats.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  caller #1        caller #2        caller #3
//!     │                │                │
//!     │ submit()       │ submit()       │ submitCoalescing()
//!     ▼                ▼                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskQueue                                                        │
//! │  - TaskId computed per submission (key or callback identity)      │
//! │  - Pending store (insertion-ordered map, O(1) dedup lookup)       │
//! │  - Bus (broadcast events) ──► SubscriberSet (user subscribers)    │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                     ┌────────────────────┐
//!                     │     Drain Loop     │   (one active per queue)
//!                     │  pop head (FIFO)   │
//!                     └──────┬─────────────┘
//!            width = 1       │        width > 1
//!        run inline, await   │   launch into in-flight set
//!                            ▼   (≤ channels, distinct identities)
//!                  ┌───────────────────┐
//!                  │  TaskContext      │  ambient, per in-flight task:
//!                  │  (task-local)     │  name/key, cooperative flag,
//!                  └───────────────────┘  wait() helper
//! ```
//!
//! ### Task lifecycle
//! ```text
//! submit ──► TaskId ──► pending store
//!                          │  duplicate identity? attach to existing record
//!                          ▼
//!                    drain loop pops (FIFO), notes is_last
//!                          │
//!   Fifo, or Coalesce+is_last ──► callback runs under TaskContext
//!   │        │                        ├─ Ok(Done(v)) ─► ticket: Ok(Some(v))
//!   │        │                        ├─ Ok(Repeat)  ─► record re-inserted,
//!   │        │                        │                 ticket stays pending
//!   │        │                        └─ Err(e)      ─► ticket: Err(e)
//!   │        ▼
//!   Coalesce, not last ─────────────► discarded: ticket resolves Ok(None)
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                  |
//! |-------------------|---------------------------------------------------------------------|-------------------------------------|
//! | **Submission**    | FIFO and coalescing admission, explicit dedup keys.                 | [`TaskQueue`], [`Ticket`]           |
//! | **Tasks**         | Define jobs as trait impls or closures; requeue via tagged result.  | [`Job`], [`JobFn`], [`Outcome`]     |
//! | **Context**       | Ambient "which task am I" handle with a cooperative wait helper.    | [`TaskContext`]                     |
//! | **Host boundary** | Yield primitive and scheduled-work signal behind a trait.           | [`Host`], [`TokioHost`]             |
//! | **Subscriber API**| Hook into queue lifecycle events (logging, metrics, custom).        | [`Subscribe`], [`SubscriberSet`]    |
//! | **Errors**        | Typed task failures, local to one ticket.                           | [`TaskError`]                       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use drainq::{JobFn, Outcome, QueueConfig, TaskContext, TaskError, TaskQueue};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Width 1 = strictly sequential; bump `channels` for parallel lanes.
//!     let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
//!         .with_name("settings")
//!         .build();
//!
//!     // FIFO: always runs, exactly once.
//!     let write = queue.submit(JobFn::arc("write-settings", |_ctx: TaskContext| async {
//!         Ok::<_, TaskError>(Outcome::Done("written".to_string()))
//!     }));
//!
//!     // Coalescing: discarded unless it is the last task waiting.
//!     let refresh = queue.submit_coalescing(JobFn::arc(
//!         "refresh-view",
//!         |ctx: TaskContext| async move {
//!             // Give the host's renderer priority before heavy work.
//!             ctx.wait().await;
//!             Ok::<_, TaskError>(Outcome::Done("refreshed".to_string()))
//!         },
//!     ));
//!
//!     assert_eq!(write.await, Ok(Some("written".to_string())));
//!     // `refresh` was last in the store when popped, so it ran.
//!     assert_eq!(refresh.await, Ok(Some("refreshed".to_string())));
//! }
//! ```

mod core;
mod error;
mod events;
mod host;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{wait, QueueBuilder, QueueConfig, TaskContext, TaskQueue};
pub use error::TaskError;
pub use events::{Bus, Event, EventKind};
pub use host::{Host, TokioHost};
pub use policies::Admission;
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Job, JobFn, JobRef, Outcome, SettleResult, Ticket};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
