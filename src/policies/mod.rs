//! # Admission policies.
//!
//! A submission carries an [`Admission`] mode that decides what happens to
//! its task when the drain loop pops it: FIFO tasks always run, coalescing
//! tasks run only when nothing else is waiting behind them.

mod admission;

pub use admission::Admission;
