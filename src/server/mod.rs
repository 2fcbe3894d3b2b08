//! Snapshot server
//!
//! [`SnapshotServer`] accepts subscriber connections and watches each one
//! for peer-initiated disconnect; [`Broadcaster`] pushes the current
//! snapshot to every registered subscriber. The two share the connection
//! registry but touch the frame-source lock and the registry lock in
//! disjoint sections, never both at once.

pub mod broadcast;
pub mod config;
pub mod listener;

pub use broadcast::Broadcaster;
pub use config::ServerConfig;
pub use listener::SnapshotServer;
