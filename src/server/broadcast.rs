//! Snapshot distribution
//!
//! Builds a frame packet from the snapshot cache and pushes it to every
//! registered subscriber. The frame-source lock is taken only to obtain the
//! snapshot and released before the registry lock is taken for sending, so
//! the two lock domains are never held together.

use std::sync::Arc;

use crate::capture::{SharedCamera, VideoSource};
use crate::error::Result;
use crate::protocol::FrameHeader;
use crate::registry::{BroadcastReport, ConnectionRegistry};
use crate::stats::ServerStats;

/// Pushes captured snapshots to all subscribers
pub struct Broadcaster<S> {
    camera: Arc<SharedCamera<S>>,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
}

impl<S: VideoSource> Broadcaster<S> {
    /// Create a broadcaster over a camera and a registry
    pub fn new(
        camera: Arc<SharedCamera<S>>,
        registry: Arc<ConnectionRegistry>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            camera,
            registry,
            stats,
        }
    }

    /// Capture a fresh snapshot and deliver it to every subscriber
    ///
    /// A subscriber whose connection fails is recorded in the report and
    /// skipped; delivery to the rest continues and the snapshot stays valid
    /// for future broadcasts.
    pub async fn broadcast(&self) -> Result<BroadcastReport> {
        let payload = self.camera.snapshot().await?;
        let header = FrameHeader::new(
            payload.len() as u32,
            self.camera.width(),
            self.camera.height(),
        );

        tracing::info!(
            bytes = payload.len(),
            width = header.width,
            height = header.height,
            "broadcasting snapshot"
        );

        let report = self
            .registry
            .send_to_all(&header.encode(), &payload)
            .await;

        self.stats.record_broadcast(
            report.delivered.len() as u64,
            report.failed.len() as u64,
            (crate::protocol::constants::FRAME_HEADER_SIZE + payload.len()) as u64,
        );

        if report.is_complete() {
            tracing::info!(subscribers = report.delivered.len(), "broadcast complete");
        } else {
            tracing::warn!(
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "broadcast incomplete"
            );
        }

        Ok(report)
    }
}

// Manual impl: `S` itself is behind an `Arc` and needs no `Clone` bound.
impl<S> Clone for Broadcaster<S> {
    fn clone(&self) -> Self {
        Self {
            camera: Arc::clone(&self.camera),
            registry: Arc::clone(&self.registry),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    use crate::capture::mock::MockSource;
    use crate::protocol::constants::{FORMAT_YUYV, FRAME_HEADER_SIZE, FRAME_MAGIC};
    use crate::registry::Subscriber;

    async fn subscriber(id: u64) -> (Subscriber, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        let (_read, write) = server.into_split();
        (Subscriber::new(id, peer, write), client)
    }

    fn broadcaster(frame: Vec<u8>, registry: Arc<ConnectionRegistry>) -> Broadcaster<MockSource> {
        let camera = Arc::new(SharedCamera::new(MockSource::streaming(4, 2, vec![frame])));
        Broadcaster::new(camera, registry, Arc::new(ServerStats::new()))
    }

    async fn read_packet(client: &mut TcpStream) -> (FrameHeader, Vec<u8>) {
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        client.read_exact(&mut header_bytes).await.unwrap();
        let header = FrameHeader::decode(&header_bytes).unwrap();
        let mut payload = vec![0u8; header.payload_len as usize];
        client.read_exact(&mut payload).await.unwrap();
        (header, payload)
    }

    #[tokio::test]
    async fn test_broadcast_delivers_packet_to_all() {
        let registry = Arc::new(ConnectionRegistry::new(4));
        let (first, mut c1) = subscriber(1).await;
        let (second, mut c2) = subscriber(2).await;
        registry.add(first).await.unwrap();
        registry.add(second).await.unwrap();

        let frame = vec![0x5A; 4 * 2 * 2];
        let broadcaster = broadcaster(frame.clone(), Arc::clone(&registry));

        let report = broadcaster.broadcast().await.unwrap();
        assert_eq!(report.delivered, vec![1, 2]);
        assert!(report.is_complete());

        for client in [&mut c1, &mut c2] {
            let (header, payload) = read_packet(client).await;
            assert_eq!(header.magic, FRAME_MAGIC);
            assert_eq!(header.width, 4);
            assert_eq!(header.height, 2);
            assert_eq!(header.format, FORMAT_YUYV);
            assert_eq!(payload, frame);
        }
    }

    #[tokio::test]
    async fn test_dead_subscriber_does_not_abort_delivery() {
        let registry = Arc::new(ConnectionRegistry::new(4));
        let (first, mut c1) = subscriber(1).await;
        let (second, c2) = subscriber(2).await;
        let (third, mut c3) = subscriber(3).await;
        registry.add(first).await.unwrap();
        registry.add(second).await.unwrap();
        registry.add(third).await.unwrap();

        // Peer 2 is already gone before the broadcast.
        drop(c2);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A frame large enough that writing into a dead socket cannot be
        // absorbed by the kernel buffer forever.
        let frame = vec![0x7E; 128 * 1024];
        let broadcaster = broadcaster(frame.clone(), Arc::clone(&registry));

        let mut failed_seen = false;
        for _ in 0..4 {
            let report = broadcaster.broadcast().await.unwrap();
            assert!(report.delivered.contains(&1));
            assert!(report.delivered.contains(&3));
            if report.failed.contains(&2) {
                failed_seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(failed_seen, "dead subscriber never reported a send failure");

        // The live subscribers got every packet intact.
        let (_, payload) = read_packet(&mut c1).await;
        assert_eq!(payload, frame);
        let (_, payload) = read_packet(&mut c3).await;
        assert_eq!(payload, frame);
    }

    #[tokio::test]
    async fn test_broadcast_with_empty_registry_succeeds() {
        let registry = Arc::new(ConnectionRegistry::new(4));
        let broadcaster = broadcaster(vec![1, 2, 3, 4], Arc::clone(&registry));

        let report = broadcaster.broadcast().await.unwrap();
        assert!(report.delivered.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_broadcast_updates_stats() {
        let registry = Arc::new(ConnectionRegistry::new(4));
        let (entry, mut client) = subscriber(1).await;
        registry.add(entry).await.unwrap();

        let frame = vec![9u8; 32];
        let camera = Arc::new(SharedCamera::new(MockSource::streaming(
            4,
            2,
            vec![frame.clone()],
        )));
        let stats = Arc::new(ServerStats::new());
        let broadcaster = Broadcaster::new(camera, registry, Arc::clone(&stats));

        broadcaster.broadcast().await.unwrap();
        let (_, payload) = read_packet(&mut client).await;
        assert_eq!(payload, frame);

        let snap = stats.snapshot();
        assert_eq!(snap.broadcasts, 1);
        assert_eq!(snap.frames_delivered, 1);
        assert_eq!(snap.bytes_sent, (FRAME_HEADER_SIZE + 32) as u64);
    }
}
