//! Snapshot subscriber client
//!
//! Connects to a snapshot server and receives frame packets as the server
//! broadcasts them. The header magic is validated before a single payload
//! byte is read, and a header declaring a payload beyond the configured cap
//! is rejected outright, so a corrupt or hostile stream cannot make the
//! client allocate or wait for garbage.

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::FRAME_HEADER_SIZE;
use crate::protocol::{FrameHeader, FramePacket};

/// Default payload cap: a 1920x1080 packed YUYV frame
const DEFAULT_MAX_PAYLOAD: usize = 1920 * 1080 * 2;

/// A connected snapshot subscriber
pub struct SnapshotClient {
    stream: TcpStream,
    peer: SocketAddr,
    max_payload: usize,
    frames_received: u64,
}

impl SnapshotClient {
    /// Connect to a snapshot server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        tracing::info!(server = %addr, "connected to snapshot server");

        Ok(Self {
            stream,
            peer: addr,
            max_payload: DEFAULT_MAX_PAYLOAD,
            frames_received: 0,
        })
    }

    /// Replace the payload size cap
    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload = max;
        self
    }

    /// Server address this client is connected to
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Number of frame packets received so far
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Receive the next frame packet
    ///
    /// Blocks until the server broadcasts. Returns `Error::Io` with
    /// `UnexpectedEof` when the server closes the connection.
    pub async fn recv(&mut self) -> Result<FramePacket> {
        let mut header_bytes = [0u8; FRAME_HEADER_SIZE];
        self.stream.read_exact(&mut header_bytes).await?;

        // Reject before the payload: a bad magic means nothing after the
        // header can be trusted.
        let header = FrameHeader::decode(&header_bytes)?;

        let len = header.payload_len as usize;
        if len > self.max_payload {
            return Err(Error::Protocol(ProtocolError::OversizedPayload {
                len,
                max: self.max_payload,
            }));
        }

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;
        self.frames_received += 1;

        tracing::info!(
            bytes = len,
            width = header.width,
            height = header.height,
            timestamp = header.timestamp,
            "snapshot received"
        );

        Ok(FramePacket {
            header,
            payload: payload.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use crate::protocol::constants::FRAME_MAGIC;

    async fn server_and_client() -> (TcpStream, SnapshotClient) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (server, client) =
            tokio::join!(listener.accept(), SnapshotClient::connect(addr));
        (server.unwrap().0, client.unwrap())
    }

    #[tokio::test]
    async fn test_recv_round_trips_packet() {
        let (mut server, mut client) = server_and_client().await;

        let packet = FramePacket::new(Bytes::from(vec![0x33; 64]), 8, 4);
        server.write_all(&packet.encode()).await.unwrap();

        let received = client.recv().await.unwrap();
        assert_eq!(received.header, packet.header);
        assert_eq!(received.payload, packet.payload);
        assert_eq!(client.frames_received(), 1);
    }

    #[tokio::test]
    async fn test_recv_rejects_bad_magic_before_payload() {
        let (mut server, mut client) = server_and_client().await;

        let mut header = FrameHeader::with_timestamp(614_400, 640, 480, 1).encode();
        header[0] ^= 0xFF;
        // No payload follows; rejection must come from the header alone.
        server.write_all(&header).await.unwrap();

        let err = client.recv().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidMagic { .. })
        ));
    }

    #[tokio::test]
    async fn test_recv_accepts_full_sized_frame() {
        let (mut server, mut client) = server_and_client().await;
        let payload = Bytes::from(vec![0xA5; 614_400]);
        let packet = FramePacket::new(payload.clone(), 640, 480);

        let writer = tokio::spawn(async move {
            server.write_all(&packet.encode()).await.unwrap();
            server
        });

        let received = client.recv().await.unwrap();
        assert_eq!(received.header.magic, FRAME_MAGIC);
        assert_eq!(received.header.payload_len, 614_400);
        assert_eq!(received.payload, payload);

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_rejects_oversized_payload() {
        let (mut server, client) = server_and_client().await;
        let mut client = client.with_max_payload(1024);

        let header = FrameHeader::with_timestamp(4096, 64, 32, 1).encode();
        server.write_all(&header).await.unwrap();

        let err = client.recv().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::OversizedPayload { len: 4096, max: 1024 })
        ));
    }
}
