//! Counters for the snapshot server

use std::sync::atomic::{AtomicU64, Ordering};

/// Server-wide counters, updated lock-free by the acceptor and broadcaster
#[derive(Debug, Default)]
pub struct ServerStats {
    total_connections: AtomicU64,
    rejected_subscribers: AtomicU64,
    broadcasts: AtomicU64,
    frames_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Connections ever accepted
    pub total_connections: u64,
    /// Connections accepted while the registry was full
    pub rejected_subscribers: u64,
    /// Broadcast events triggered
    pub broadcasts: u64,
    /// Per-subscriber deliveries that completed
    pub frames_delivered: u64,
    /// Per-subscriber deliveries that hit a hard error
    pub delivery_failures: u64,
    /// Header and payload bytes put on the wire
    pub bytes_sent: u64,
}

impl ServerStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_subscriber(&self) {
        self.rejected_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, delivered: u64, failed: u64, packet_len: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.delivery_failures.fetch_add(failed, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(delivered * packet_len, Ordering::Relaxed);
    }

    /// Copy out the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            rejected_subscribers: self.rejected_subscribers.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_zeroed() {
        let stats = ServerStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_record_broadcast_accumulates() {
        let stats = ServerStats::new();
        stats.record_broadcast(2, 1, 100);
        stats.record_broadcast(3, 0, 50);

        let snap = stats.snapshot();
        assert_eq!(snap.broadcasts, 2);
        assert_eq!(snap.frames_delivered, 5);
        assert_eq!(snap.delivery_failures, 1);
        assert_eq!(snap.bytes_sent, 2 * 100 + 3 * 50);
    }

    #[test]
    fn test_record_connections() {
        let stats = ServerStats::new();
        stats.record_connection();
        stats.record_connection();
        stats.record_rejected_subscriber();

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 2);
        assert_eq!(snap.rejected_subscribers, 1);
    }
}
