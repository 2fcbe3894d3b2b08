//! Snapshot server listener
//!
//! Handles the TCP accept loop and spawns a monitor task per connection.
//! The monitor watches for peer-initiated disconnect (a zero-length read or
//! a hard read error), removes the connection from the registry and lets
//! its socket close exactly once.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;

use crate::error::Result;
use crate::registry::{ConnectionRegistry, Subscriber};
use crate::server::config::ServerConfig;
use crate::stats::ServerStats;

/// Snapshot broadcast server
pub struct SnapshotServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<ServerStats>,
    next_session_id: AtomicU64,
    closing: watch::Sender<bool>,
}

impl SnapshotServer {
    /// Create a server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.max_subscribers));
        let (closing, _) = watch::channel(false);

        Self {
            config,
            registry,
            stats: Arc::new(ServerStats::new()),
            next_session_id: AtomicU64::new(1),
            closing,
        }
    }

    /// The connection registry backing this server
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Server counters
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// The configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the listening socket with the configured backlog
    pub fn bind(&self) -> Result<TcpListener> {
        let socket = match self.config.bind_addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(self.config.bind_addr)?;
        Ok(socket.listen(self.config.backlog)?)
    }

    /// Bind and run until the shutdown future completes
    ///
    /// Completion of `shutdown` cancels a pending accept and drops the
    /// listening socket; per-connection monitors are signalled to wind down.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Run the accept loop on an already-bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "snapshot server listening");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        // Wake monitors blocked on their sockets; the listener drops here,
        // unblocking any pending accept on other handles of it.
        let _ = self.closing.send(true);

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.stats.record_connection();

        tracing::info!(session_id = session_id, peer = %peer_addr, "subscriber connected");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(session_id = session_id, error = %e, "failed to set nodelay");
            }
        }

        let (reader, writer) = socket.into_split();
        let subscriber = Subscriber::new(session_id, peer_addr, writer);

        // A full registry still keeps the socket open: the write half is
        // parked with the monitor, untracked for broadcast.
        let parked = match self.registry.add(subscriber).await {
            Ok(()) => None,
            Err(rejected) => {
                self.stats.record_rejected_subscriber();
                Some(rejected)
            }
        };

        let registry = Arc::clone(&self.registry);
        let closing = self.closing.subscribe();

        tokio::spawn(async move {
            monitor_connection(registry, session_id, peer_addr, reader, parked, closing).await;
        });
    }
}

/// Watch one connection for peer-side closure
///
/// Runs until the peer closes, the connection errors hard, or the server
/// winds down. On exit the connection leaves the registry and both socket
/// halves drop, closing it exactly once.
async fn monitor_connection(
    registry: Arc<ConnectionRegistry>,
    session_id: u64,
    peer_addr: SocketAddr,
    mut reader: OwnedReadHalf,
    parked: Option<Subscriber>,
    mut closing: watch::Receiver<bool>,
) {
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            _ = closing.changed() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!(session_id = session_id, peer = %peer_addr, "peer disconnected");
                    break;
                }
                // Subscribers have nothing meaningful to say; drain and ignore.
                Ok(_) => continue,
                Err(e) => {
                    tracing::info!(session_id = session_id, peer = %peer_addr, error = %e, "connection error");
                    break;
                }
            }
        }
    }

    registry.remove(session_id).await;
    drop(parked);
    tracing::debug!(session_id = session_id, "monitor exited");
}
