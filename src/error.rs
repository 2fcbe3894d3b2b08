//! Error types
//!
//! One crate-wide [`Error`] plus the specific error families it wraps.
//! Device failures are fatal to initialization and surfaced to the caller;
//! a dry buffer ring is reported as [`CaptureError::NotReady`] and is not an
//! error condition, callers back off and retry.

use std::io;
use std::path::PathBuf;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Capture device failure
    Device(DeviceError),
    /// Frame acquisition failure (including an exhausted retry budget)
    Capture(CaptureError),
    /// Wire format violation
    Protocol(ProtocolError),
    /// Socket or file I/O failure
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Device(e) => write!(f, "device error: {}", e),
            Error::Capture(e) => write!(f, "capture error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Device(e) => Some(e),
            Error::Capture(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Error::Capture(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Capture device failure
///
/// Every variant is fatal to the operation that produced it. Initialization
/// cleans up any partially opened state before returning one of these.
#[derive(Debug)]
pub enum DeviceError {
    /// Opening the device node failed
    Open { path: PathBuf, source: io::Error },
    /// Querying device capabilities failed
    Capabilities(io::Error),
    /// Setting the capture format failed
    Negotiate(io::Error),
    /// Preparing the device handle failed
    Configure(io::Error),
    /// The device would not accept the packed YUYV pixel format
    Format { fourcc: String },
    /// Requesting or mapping the buffer ring failed
    BufferSetup(io::Error),
    /// Re-queueing a buffer slot failed
    Queue(io::Error),
    /// Dequeueing a filled buffer slot failed
    Dequeue(io::Error),
    /// Toggling the streaming state failed
    Streaming(io::Error),
    /// Operation on a closed or never-opened source
    Closed,
    /// Frame operation while streaming is off
    NotStreaming,
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Open { path, source } => {
                write!(f, "failed to open {}: {}", path.display(), source)
            }
            DeviceError::Capabilities(e) => write!(f, "capability query failed: {}", e),
            DeviceError::Negotiate(e) => write!(f, "format negotiation failed: {}", e),
            DeviceError::Configure(e) => write!(f, "device handle configuration failed: {}", e),
            DeviceError::Format { fourcc } => {
                write!(f, "device negotiated unsupported pixel format {}", fourcc)
            }
            DeviceError::BufferSetup(e) => write!(f, "buffer ring setup failed: {}", e),
            DeviceError::Queue(e) => write!(f, "buffer queue failed: {}", e),
            DeviceError::Dequeue(e) => write!(f, "buffer dequeue failed: {}", e),
            DeviceError::Streaming(e) => write!(f, "stream toggle failed: {}", e),
            DeviceError::Closed => write!(f, "capture source is closed"),
            DeviceError::NotStreaming => write!(f, "capture source is not streaming"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Open { source, .. } => Some(source),
            DeviceError::Capabilities(e)
            | DeviceError::Negotiate(e)
            | DeviceError::Configure(e)
            | DeviceError::BufferSetup(e)
            | DeviceError::Queue(e)
            | DeviceError::Dequeue(e)
            | DeviceError::Streaming(e) => Some(e),
            _ => None,
        }
    }
}

/// Frame acquisition outcome short of a full frame
#[derive(Debug)]
pub enum CaptureError {
    /// No filled buffer is pending. Expected and transient; retry after a
    /// short delay.
    NotReady,
    /// The device failed underneath the acquisition
    Device(DeviceError),
}

impl CaptureError {
    /// Whether this is the transient no-frame condition rather than a fault
    pub fn is_not_ready(&self) -> bool {
        matches!(self, CaptureError::NotReady)
    }
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NotReady => write!(f, "no frame ready"),
            CaptureError::Device(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::NotReady => None,
            CaptureError::Device(e) => Some(e),
        }
    }
}

impl From<DeviceError> for CaptureError {
    fn from(e: DeviceError) -> Self {
        CaptureError::Device(e)
    }
}

/// Wire format violation in a frame packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Header magic did not match; nothing after it was read
    InvalidMagic { found: u32 },
    /// Header declared a payload larger than the receiver's cap
    OversizedPayload { len: usize, max: usize },
    /// Not enough bytes to hold a header
    Truncated { len: usize },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::InvalidMagic { found } => {
                write!(f, "invalid packet magic 0x{:08X}", found)
            }
            ProtocolError::OversizedPayload { len, max } => {
                write!(f, "payload of {} bytes exceeds cap of {} bytes", len, max)
            }
            ProtocolError::Truncated { len } => {
                write!(f, "{} bytes is too short for a frame header", len)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}
