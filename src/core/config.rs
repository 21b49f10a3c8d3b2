//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the per-queue settings consumed by
//! [`QueueBuilder`](crate::QueueBuilder).
//!
//! ## Sentinel values
//! - `channels = 0` → treated as 1 (a queue always has at least one lane)
//! - `bus_capacity = 0` → treated as 1 (clamped by the bus)

/// Configuration for a [`TaskQueue`](crate::TaskQueue).
///
/// ## Field semantics
/// - `channels`: concurrency width. `1` means strictly sequential FIFO
///   draining; `n > 1` lets up to `n` tasks with distinct identities run
///   concurrently (per-identity execution stays sequential).
/// - `bus_capacity`: event bus ring buffer size. Slow subscribers that lag
///   behind more than this many events skip the oldest ones.
///
/// ## Notes
/// All fields are public for flexibility. Prefer the `*_clamped` accessors
/// over reading fields directly, to avoid sprinkling sentinel checks.
#[derive(Clone, Copy, Debug)]
pub struct QueueConfig {
    /// Concurrency width (number of parallel lanes). Minimum 1.
    pub channels: usize,

    /// Capacity of the event bus broadcast ring buffer. Minimum 1.
    pub bus_capacity: usize,
}

impl QueueConfig {
    /// Creates a config with the given width and default bus capacity.
    pub fn with_channels(channels: usize) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    /// Returns the concurrency width clamped to a minimum of 1.
    #[inline]
    pub fn channels_clamped(&self) -> usize {
        self.channels.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `channels = 1` (strictly sequential)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            channels: 1,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sequential() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.channels_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_zero_width_is_clamped() {
        let cfg = QueueConfig {
            channels: 0,
            bus_capacity: 0,
        };
        assert_eq!(cfg.channels_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
