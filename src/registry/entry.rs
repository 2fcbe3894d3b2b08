//! Subscriber entry type

use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

/// One registered subscriber connection
///
/// Owns the socket's write half; dropping the entry closes that half.
pub struct Subscriber {
    id: u64,
    peer: SocketAddr,
    writer: OwnedWriteHalf,
    bytes_sent: u64,
    connected_at: Instant,
}

impl Subscriber {
    /// Create an entry for an accepted connection
    pub fn new(id: u64, peer: SocketAddr, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            peer,
            writer,
            bytes_sent: 0,
            connected_at: Instant::now(),
        }
    }

    /// Session id assigned at accept time
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Peer address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Total payload and header bytes delivered to this subscriber
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// When the connection was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Write a frame packet in full
    ///
    /// `write_all` keeps writing through partial sends until every byte of
    /// the header and payload is on the wire or the connection reports a
    /// hard error.
    pub(crate) async fn send_frame(&mut self, header: &[u8], payload: &[u8]) -> io::Result<()> {
        self.writer.write_all(header).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        self.bytes_sent += (header.len() + payload.len()) as u64;
        Ok(())
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("bytes_sent", &self.bytes_sent)
            .finish()
    }
}
