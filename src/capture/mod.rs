//! Frame acquisition pipeline
//!
//! The capture device exposes a fixed ring of memory-mapped buffers that the
//! driver fills in rotation. A slot must be handed back before it can be
//! filled again, and at most one slot may be held by the application at any
//! time.
//!
//! ```text
//!                driver fills                application holds
//!         ┌──► [slot 0] ──┐
//!         │    [slot 1]   ├── dequeue ──► FrameView ──┐
//!         │    [slot 2]   │                           │
//!         └─── [slot 3] ◄─┴────────── queue ◄─────────┘
//! ```
//!
//! [`Camera`] owns the ring and enforces the acquire/release bracket through
//! [`FrameView`]: the view mutably borrows the camera, so a second acquire
//! cannot compile while one is live, and the slot is re-queued on every exit
//! path when the view drops.
//!
//! [`SharedCamera`] serializes all access behind one lock so the local
//! renderer and the snapshot path never interleave a dequeue/enqueue pair,
//! and keeps the most recent snapshot as an owned copy under the same lock.

pub mod config;
pub mod device;
#[cfg(test)]
pub mod mock;
pub mod shared;
pub mod traits;

pub use config::CameraConfig;
pub use device::{Camera, FrameView, SourceState};
pub use shared::{RetryPolicy, SharedCamera};
pub use traits::VideoSource;
