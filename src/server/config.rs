//! Server configuration

use std::net::SocketAddr;

use crate::protocol::constants::{DEFAULT_MAX_SUBSCRIBERS, DEFAULT_PORT, LISTEN_BACKLOG};

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Listen backlog for the accept socket
    pub backlog: u32,

    /// Registry capacity; connections beyond it stay open but are not
    /// tracked for broadcast
    pub max_subscribers: usize,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            backlog: LISTEN_BACKLOG,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the registry capacity
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog.max(1);
        self
    }

    /// Disable TCP_NODELAY on accepted sockets
    pub fn disable_nodelay(mut self) -> Self {
        self.tcp_nodelay = false;
        self
    }
}
