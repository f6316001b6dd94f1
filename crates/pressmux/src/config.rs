//! Configuration types for the compression layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a compressed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressConfig {
    /// Debounce window for the background flush scheduler.
    ///
    /// The first write after a flush arms the timer; writes landing inside
    /// the window share the same flush. The window is anchored to the first
    /// write of a burst and is not extended by later writes, so flush
    /// latency is bounded by one interval. Sub-millisecond values are
    /// rounded up to the runtime timer's granularity.
    pub flush_interval: Duration,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_micros(1),
        }
    }
}
