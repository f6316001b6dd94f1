//! Byte counters for compressed connections.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live byte counters for one compressed connection.
///
/// Four independent monotonic counters: bytes moved on the raw connection
/// in each direction, and bytes exchanged with the application in each
/// direction. Handles are cheap to clone and stay readable after the
/// connection is closed or dropped. Loads and stores are relaxed; no
/// ordering is promised between the four counters, and each wraps at
/// `u64::MAX` (unreachable in practice).
#[derive(Debug, Clone, Default)]
pub struct CompressionMetrics {
    net_read: Arc<AtomicU64>,
    net_write: Arc<AtomicU64>,
    uncomp_read: Arc<AtomicU64>,
    uncomp_write: Arc<AtomicU64>,
}

impl CompressionMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Compressed bytes read from the raw connection.
    pub fn net_read(&self) -> u64 {
        self.net_read.load(Ordering::Relaxed)
    }

    /// Compressed bytes written to the raw connection.
    pub fn net_write(&self) -> u64 {
        self.net_write.load(Ordering::Relaxed)
    }

    /// Decompressed bytes handed to the application.
    pub fn uncomp_read(&self) -> u64 {
        self.uncomp_read.load(Ordering::Relaxed)
    }

    /// Application bytes accepted by the encoder.
    pub fn uncomp_write(&self) -> u64 {
        self.uncomp_write.load(Ordering::Relaxed)
    }

    /// Reads all four counters at once.
    ///
    /// The loads are independent; a snapshot taken while traffic is in
    /// flight may observe the two directions at slightly different points.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            net_read: self.net_read(),
            net_write: self.net_write(),
            uncomp_read: self.uncomp_read(),
            uncomp_write: self.uncomp_write(),
        }
    }

    pub(crate) fn net_read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.net_read)
    }

    pub(crate) fn net_write_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.net_write)
    }

    pub(crate) fn add_uncomp_read(&self, n: u64) {
        self.uncomp_read.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_uncomp_write(&self, n: u64) {
        self.uncomp_write.fetch_add(n, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the four counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Compressed bytes read from the raw connection.
    pub net_read: u64,
    /// Compressed bytes written to the raw connection.
    pub net_write: u64,
    /// Decompressed bytes handed to the application.
    pub uncomp_read: u64,
    /// Application bytes accepted by the encoder.
    pub uncomp_write: u64,
}

impl MetricsSnapshot {
    /// Wire bytes per application byte on the write path.
    ///
    /// `None` before any application writes. Values below 1.0 mean the
    /// codec is shrinking the stream.
    pub fn write_ratio(&self) -> Option<f64> {
        (self.uncomp_write > 0).then(|| self.net_write as f64 / self.uncomp_write as f64)
    }

    /// Wire bytes per application byte on the read path.
    ///
    /// `None` before any application reads.
    pub fn read_ratio(&self) -> Option<f64> {
        (self.uncomp_read > 0).then(|| self.net_read as f64 / self.uncomp_read as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = CompressionMetrics::new();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                net_read: 0,
                net_write: 0,
                uncomp_read: 0,
                uncomp_write: 0,
            }
        );
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = CompressionMetrics::new();
        let handle = metrics.clone();
        metrics.add_uncomp_write(7);
        metrics.net_write_counter().fetch_add(3, Ordering::Relaxed);
        assert_eq!(handle.uncomp_write(), 7);
        assert_eq!(handle.net_write(), 3);
        assert_eq!(handle.uncomp_read(), 0);
    }

    #[test]
    fn test_ratios_guard_against_empty_streams() {
        let empty = MetricsSnapshot {
            net_read: 0,
            net_write: 0,
            uncomp_read: 0,
            uncomp_write: 0,
        };
        assert_eq!(empty.write_ratio(), None);
        assert_eq!(empty.read_ratio(), None);

        let shrunk = MetricsSnapshot {
            net_read: 0,
            net_write: 50,
            uncomp_read: 0,
            uncomp_write: 200,
        };
        assert_eq!(shrunk.write_ratio(), Some(0.25));
    }
}
