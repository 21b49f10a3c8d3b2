//! # Queue builder.
//!
//! [`QueueBuilder`] wires together everything a [`TaskQueue`] needs: the
//! event bus, the subscriber fan-out listener, the host boundary, and the
//! shutdown token.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::config::QueueConfig;
use crate::core::queue::TaskQueue;
use crate::events::Bus;
use crate::host::{Host, TokioHost};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`TaskQueue`] with optional features.
pub struct QueueBuilder<T> {
    name: Cow<'static, str>,
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    host: Arc<dyn Host>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + 'static> QueueBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            name: Cow::Borrowed("queue"),
            cfg,
            subscribers: Vec::new(),
            host: Arc::new(TokioHost),
            _marker: PhantomData,
        }
    }

    /// Sets the queue name carried by every event it publishes.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive queue events (admission, lifecycle, drain loop)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides the host boundary (yield primitive + scheduled-work signal).
    ///
    /// Defaults to [`TokioHost`].
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Builds and returns the queue.
    ///
    /// When subscribers were configured, this spawns the fan-out listener
    /// and therefore must be called within a Tokio runtime. A queue without
    /// subscribers can be built anywhere.
    pub fn build(self) -> TaskQueue<T> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let set = Arc::new(SubscriberSet::new(self.subscribers));
            let mut rx = bus.subscribe();
            // Exits when every handle on the bus is gone.
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => set.emit(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            });
        }

        TaskQueue::from_parts(self.name, self.cfg, bus, self.host, CancellationToken::new())
    }
}
