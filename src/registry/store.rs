//! Connection registry implementation

use tokio::sync::Mutex;

use super::entry::Subscriber;

/// Bounded, ordered set of subscriber connections
///
/// Capacity is fixed at construction. A linear scan over a small `Vec` is
/// deliberate: the set is bounded and iteration order is the registration
/// order.
pub struct ConnectionRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
    capacity: usize,
}

/// Outcome of one fan-out pass
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Session ids that received the full packet
    pub delivered: Vec<u64>,
    /// Session ids whose connection reported a hard error, skipped
    pub failed: Vec<u64>,
}

impl BroadcastReport {
    /// Whether every registered subscriber received the packet
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ConnectionRegistry {
    /// Create a registry with room for `capacity` subscribers
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Maximum number of tracked subscribers
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently tracked subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Whether no subscriber is tracked
    pub async fn is_empty(&self) -> bool {
        self.subscribers.lock().await.is_empty()
    }

    /// Register a subscriber
    ///
    /// Appends when under capacity. On a full registry the subscriber is
    /// handed back unchanged so the caller can keep the socket alive
    /// outside the broadcast set; existing entries are never disturbed.
    pub async fn add(&self, subscriber: Subscriber) -> Result<(), Subscriber> {
        let mut subscribers = self.subscribers.lock().await;

        if subscribers.len() >= self.capacity {
            tracing::warn!(
                session_id = subscriber.id(),
                peer = %subscriber.peer(),
                capacity = self.capacity,
                "registry full, subscriber not tracked"
            );
            return Err(subscriber);
        }

        tracing::info!(
            session_id = subscriber.id(),
            peer = %subscriber.peer(),
            subscribers = subscribers.len() + 1,
            "subscriber registered"
        );
        subscribers.push(subscriber);
        Ok(())
    }

    /// Remove a subscriber by session id
    ///
    /// Compacts the set, preserving the relative order of the rest, and
    /// returns the removed entry. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: u64) -> Option<Subscriber> {
        let mut subscribers = self.subscribers.lock().await;

        let position = subscribers.iter().position(|s| s.id() == id)?;
        let removed = subscribers.remove(position);
        tracing::info!(
            session_id = id,
            peer = %removed.peer(),
            subscribers = subscribers.len(),
            "subscriber removed"
        );
        Some(removed)
    }

    /// Visit every tracked subscriber in registration order
    ///
    /// The registry lock is held for the whole iteration.
    pub async fn for_each(&self, mut visit: impl FnMut(&Subscriber)) {
        let subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter() {
            visit(subscriber);
        }
    }

    /// Send one frame packet to every tracked subscriber
    ///
    /// Holds the registry lock for the full pass. A failing connection is
    /// recorded and skipped; it neither aborts delivery to the rest nor
    /// gets pruned here; its monitor removes it on the next liveness poll.
    pub async fn send_to_all(&self, header: &[u8], payload: &[u8]) -> BroadcastReport {
        let mut subscribers = self.subscribers.lock().await;
        let mut report = BroadcastReport::default();

        for subscriber in subscribers.iter_mut() {
            match subscriber.send_frame(header, payload).await {
                Ok(()) => {
                    tracing::debug!(
                        session_id = subscriber.id(),
                        bytes = header.len() + payload.len(),
                        "frame delivered"
                    );
                    report.delivered.push(subscriber.id());
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = subscriber.id(),
                        peer = %subscriber.peer(),
                        error = %e,
                        "frame delivery failed, skipping subscriber"
                    );
                    report.failed.push(subscriber.id());
                }
            }
        }

        report
    }

    /// Drop every tracked subscriber, closing their write halves
    ///
    /// Part of coordinated shutdown; monitors observing the closed sockets
    /// find their entries already gone and remove nothing.
    pub async fn clear(&self) {
        let mut subscribers = self.subscribers.lock().await;
        let count = subscribers.len();
        subscribers.clear();
        if count > 0 {
            tracing::info!(subscribers = count, "registry cleared");
        }
    }
}
