//! # Event subscribers for the queue.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver [`Event`](crate::Event)s published on the
//! queue's bus to user-defined handlers (logging, metrics, alerts).
//!
//! ```text
//! Event flow:
//!   queue ── publish(Event) ──► Bus ──► queue listener ──► SubscriberSet::emit(&Event)
//!                                                        ┌─────────┬─────────┐
//!                                                        ▼         ▼         ▼
//!                                                   [queue S1] [queue S2] [queue SN]
//!                                                        ▼         ▼         ▼
//!                                                   worker S1 worker S2 worker SN
//!                                                        ▼         ▼         ▼
//!                                                  sub.on_event(&Event) (per subscriber)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use drainq::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskFailed {
//!             // increment failure counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
