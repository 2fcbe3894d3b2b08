//! Capture source seam
//!
//! The serializer, broadcaster and renderer are written against this trait
//! rather than the V4L2 device directly, so they can be exercised off
//! hardware with a scripted source.

use crate::error::{CaptureError, DeviceError};

/// A source of packed YUYV frames with an acquire/use/release discipline
pub trait VideoSource: Send {
    /// Capture width in pixels, fixed after initialization
    fn width(&self) -> u32;

    /// Capture height in pixels, fixed after initialization
    fn height(&self) -> u32;

    /// Turn streaming on; a no-op when already streaming
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Turn streaming off; a no-op when already stopped
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Acquire the next filled buffer, pass its valid bytes to `visit`, and
    /// release the buffer before returning, on every path.
    ///
    /// Fails fast with [`CaptureError::NotReady`] when no filled buffer is
    /// pending; `visit` is not called in that case.
    fn with_frame(&mut self, visit: &mut dyn FnMut(&[u8])) -> Result<(), CaptureError>;

    /// Release the device; safe to call repeatedly
    fn close(&mut self);
}
