//! Snapshot wire protocol
//!
//! One broadcast event produces one packet per subscriber:
//!
//! ```text
//! Server                                  Subscriber
//!   |                                        |
//!   |---- header (24 bytes, 6 x u32) ------->|
//!   |---- payload (payload_len raw bytes) -->|
//!   |                                        |
//! ```
//!
//! There is no framing beyond the fixed header. Fields are native-endian
//! because the original deployment sends the raw header struct between
//! same-architecture peers; a receiver on a different endianness is out of
//! scope.

pub mod constants;
pub mod packet;

pub use packet::{FrameHeader, FramePacket};
