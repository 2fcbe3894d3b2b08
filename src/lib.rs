//! # framecast
//!
//! Captures live video from a V4L2 device, renders it locally and
//! distributes on-demand snapshot frames to TCP subscribers.
//!
//! The capture device hands out a fixed ring of memory-mapped buffers;
//! [`capture::Camera`] enforces the acquire/release discipline on that
//! ring, and [`capture::SharedCamera`] serializes access so a local render
//! loop and the snapshot path can share one device safely. Snapshots are
//! broadcast as simple header-plus-payload packets to every connection in
//! a bounded [`registry::ConnectionRegistry`].
//!
//! ```text
//! camera ─► Camera ─► SharedCamera ─┬─► Renderer ─► PixelSink
//!          (ring)    (one lock)     └─► snapshot ─► Broadcaster ─► registry ─► TCP
//! ```
//!
//! # Example
//!
//! ```no_run
//! use framecast::{MonitorConfig, VideoMonitor};
//! # use framecast::{PixelSink, TouchInput, TouchPoint};
//! # struct Lcd;
//! # impl PixelSink for Lcd { fn set_pixel(&mut self, _: u32, _: u32, _: u32) {} }
//! # struct Panel;
//! # impl TouchInput for Panel {
//! #     async fn next_point(&mut self) -> std::io::Result<TouchPoint> {
//! #         std::future::pending().await
//! #     }
//! # }
//!
//! # async fn example() -> framecast::Result<()> {
//! let monitor = VideoMonitor::new(MonitorConfig::default());
//! let stats = monitor.run(Lcd, Panel).await?;
//! println!("served {} broadcasts", stats.broadcasts);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod client;
pub mod display;
pub mod error;
pub mod media;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use capture::{Camera, CameraConfig, SharedCamera, VideoSource};
pub use client::SnapshotClient;
pub use display::{PixelSink, Renderer};
pub use error::{Error, Result};
pub use monitor::{ControlLayout, MonitorConfig, TouchInput, TouchPoint, VideoMonitor};
pub use protocol::{FrameHeader, FramePacket};
pub use registry::ConnectionRegistry;
pub use server::{Broadcaster, ServerConfig, SnapshotServer};
pub use stats::{ServerStats, StatsSnapshot};
