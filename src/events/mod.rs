//! # Queue lifecycle events.
//!
//! Every observable step of a task's life (submission, dedup, start,
//! discard, requeue, settlement) and of the drain loop itself is published
//! as an [`Event`] on a [`Bus`], a thin broadcast channel. Subscribers
//! (see [`Subscribe`](crate::Subscribe)) consume the stream for logging or
//! metrics.
//!
//! ```text
//! Event flow:
//!   admit()/drain loop ── publish(Event) ──► Bus ──► queue listener ──► SubscriberSet
//! ```

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
