//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [submitted] queue=default task=sync-settings
//! [deduplicated] queue=default task=sync-settings
//! [started] queue=default task=sync-settings
//! [discarded] queue=default task=refresh-thumbnails
//! [requeued] queue=default task=sync-settings
//! [settled] queue=default task=sync-settings
//! [failed] queue=default task=sync-settings err="disk full"
//! [drain-idle] queue=default
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let queue = e.queue.as_deref().unwrap_or("?");
        let task = e.task.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::TaskSubmitted => println!("[submitted] queue={queue} task={task}"),
            EventKind::TaskDeduplicated => println!("[deduplicated] queue={queue} task={task}"),
            EventKind::TaskStarted => println!("[started] queue={queue} task={task}"),
            EventKind::TaskSettled => println!("[settled] queue={queue} task={task}"),
            EventKind::TaskFailed => {
                println!(
                    "[failed] queue={queue} task={task} err={:?}",
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::TaskDiscarded => println!("[discarded] queue={queue} task={task}"),
            EventKind::TaskRequeued => println!("[requeued] queue={queue} task={task}"),
            EventKind::TaskCanceled => println!("[canceled] queue={queue} task={task}"),
            EventKind::DrainStarted => println!("[drain-started] queue={queue}"),
            EventKind::DrainIdle => println!("[drain-idle] queue={queue}"),
            EventKind::WaitBudgetExhausted => {
                println!(
                    "[wait-budget-exhausted] queue={queue} task={task} label={:?}",
                    e.reason.as_deref().unwrap_or("")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
