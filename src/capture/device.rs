//! V4L2 frame source
//!
//! Owns the device handle and its memory-mapped buffer ring. The state
//! machine is Closed → Opened → Configured → Streaming ⇄ Stopped → Closed;
//! [`Camera::open`] walks the first three states and returns a configured
//! source with every ring slot queued, [`Camera::close`] is reachable and
//! safe from any state.

use std::io;
use std::os::fd::AsRawFd;

use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::{CaptureStream, Stream as _};
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::error::{CaptureError, DeviceError};

use super::config::CameraConfig;
use super::traits::VideoSource;

const PIXEL_FORMAT: &[u8; 4] = b"YUYV";

/// Lifecycle state of a [`Camera`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Opened and format-negotiated, ring mapped and queued, streaming off
    Configured,
    /// Hardware is filling the ring
    Streaming,
    /// Streaming turned off after having run
    Stopped,
    /// Device released; only `close` remains valid
    Closed,
}

/// A V4L2 capture device with a fixed ring of mapped buffers
///
/// The ring size and slot mappings are immutable after [`Camera::open`].
/// At most one slot is ever dequeued at a time, enforced at compile time:
/// [`Camera::acquire`] mutably borrows the camera for the lifetime of the
/// returned [`FrameView`].
pub struct Camera {
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    width: u32,
    height: u32,
    buffers: u32,
    state: SourceState,
    // Instrumentation for the acquire/release bracket; stays in {0, 1}.
    outstanding: u32,
}

impl Camera {
    /// Open and configure a capture device
    ///
    /// Opens the node, negotiates packed YUYV at the requested dimensions,
    /// maps the buffer ring and queues every slot. Any failure releases
    /// whatever was set up before it; no partial state is retained.
    pub fn open(config: &CameraConfig) -> Result<Self, DeviceError> {
        let device = Device::with_path(&config.path).map_err(|e| DeviceError::Open {
            path: config.path.clone(),
            source: e,
        })?;

        let caps = device.query_caps().map_err(DeviceError::Capabilities)?;
        tracing::info!(card = %caps.card, path = %config.path.display(), "capture device opened");

        let requested = Format::new(config.width, config.height, FourCC::new(PIXEL_FORMAT));
        let format = device.set_format(&requested).map_err(DeviceError::Negotiate)?;
        if format.fourcc != FourCC::new(PIXEL_FORMAT) {
            return Err(DeviceError::Format {
                fourcc: format.fourcc.to_string(),
            });
        }
        if format.width != config.width || format.height != config.height {
            tracing::info!(
                width = format.width,
                height = format.height,
                "driver adjusted capture dimensions"
            );
        }

        // Non-blocking dequeue: a dry ring reports EAGAIN instead of
        // blocking the caller inside the serializer lock.
        set_nonblocking(&device).map_err(DeviceError::Configure)?;

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffers)
            .map_err(DeviceError::BufferSetup)?;

        for index in 0..config.buffers as usize {
            stream.queue(index).map_err(DeviceError::Queue)?;
        }

        tracing::info!(
            width = format.width,
            height = format.height,
            buffers = config.buffers,
            "capture ring initialized"
        );

        Ok(Self {
            device: Some(device),
            stream: Some(stream),
            width: format.width,
            height: format.height,
            buffers: config.buffers,
            state: SourceState::Configured,
            outstanding: 0,
        })
    }

    /// Negotiated capture width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Negotiated capture height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current lifecycle state
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Turn hardware streaming on
    ///
    /// A no-op when already streaming. Restarting after [`Camera::stop`]
    /// re-queues every slot first, since turning streaming off empties the
    /// driver queues.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        match self.state {
            SourceState::Streaming => Ok(()),
            SourceState::Closed => Err(DeviceError::Closed),
            SourceState::Configured => {
                self.stream_mut()?.start().map_err(DeviceError::Streaming)?;
                self.state = SourceState::Streaming;
                tracing::info!("capture streaming on");
                Ok(())
            }
            SourceState::Stopped => {
                let buffers = self.buffers;
                let stream = self.stream_mut()?;
                for index in 0..buffers as usize {
                    stream.queue(index).map_err(DeviceError::Queue)?;
                }
                stream.start().map_err(DeviceError::Streaming)?;
                self.state = SourceState::Streaming;
                tracing::info!("capture streaming on");
                Ok(())
            }
        }
    }

    /// Turn hardware streaming off
    ///
    /// A no-op when streaming is already off.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        match self.state {
            SourceState::Configured | SourceState::Stopped => Ok(()),
            SourceState::Closed => Err(DeviceError::Closed),
            SourceState::Streaming => {
                self.stream_mut()?.stop().map_err(DeviceError::Streaming)?;
                self.state = SourceState::Stopped;
                tracing::info!("capture streaming off");
                Ok(())
            }
        }
    }

    /// Dequeue the next filled ring slot
    ///
    /// Returns [`CaptureError::NotReady`] immediately when the device has no
    /// pending buffer. The returned view holds the slot until it drops;
    /// the borrow it takes on the camera makes a second `acquire` before
    /// release a compile error.
    pub fn acquire(&mut self) -> Result<FrameView<'_>, CaptureError> {
        match self.state {
            SourceState::Streaming => {}
            SourceState::Closed => return Err(DeviceError::Closed.into()),
            _ => return Err(DeviceError::NotStreaming.into()),
        }

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(DeviceError::Closed.into()),
        };

        let index = match stream.dequeue() {
            Ok(index) => index,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(CaptureError::NotReady);
            }
            Err(e) => return Err(DeviceError::Dequeue(e).into()),
        };

        let len = stream
            .get_meta(index)
            .map(|meta| meta.bytesused as usize)
            .unwrap_or(0);

        self.outstanding += 1;
        debug_assert_eq!(self.outstanding, 1);

        Ok(FrameView {
            camera: self,
            index,
            len,
        })
    }

    /// Release the device
    ///
    /// Unmaps the ring and closes the handle. Safe to call from any state
    /// and repeatedly; later calls are no-ops.
    pub fn close(&mut self) {
        if self.state == SourceState::Closed {
            return;
        }

        if self.state == SourceState::Streaming {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(e) = stream.stop() {
                    tracing::warn!(error = %e, "stream off during close failed");
                }
            }
        }

        self.stream = None;
        self.device = None;
        self.state = SourceState::Closed;
        tracing::info!("capture device closed");
    }

    fn stream_mut(&mut self) -> Result<&mut MmapStream<'static>, DeviceError> {
        self.stream.as_mut().ok_or(DeviceError::Closed)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}

impl VideoSource for Camera {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        Camera::start(self)
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        Camera::stop(self)
    }

    fn with_frame(&mut self, visit: &mut dyn FnMut(&[u8])) -> Result<(), CaptureError> {
        let view = self.acquire()?;
        visit(view.bytes());
        view.release();
        Ok(())
    }

    fn close(&mut self) {
        Camera::close(self)
    }
}

/// A borrowed reference to one dequeued ring slot
///
/// Lives exactly from acquire to release: dropping the view re-queues the
/// slot, so every exit path, including error paths, hands the buffer back
/// to the driver.
pub struct FrameView<'a> {
    camera: &'a mut Camera,
    index: usize,
    len: usize,
}

impl FrameView<'_> {
    /// The valid bytes of the captured frame
    pub fn bytes(&self) -> &[u8] {
        match self
            .camera
            .stream
            .as_ref()
            .and_then(|stream| stream.get(self.index))
        {
            Some(buf) => &buf[..self.len.min(buf.len())],
            None => &[],
        }
    }

    /// Number of valid bytes in the slot
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the driver reported an empty fill
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ring slot index backing this view
    pub fn slot(&self) -> usize {
        self.index
    }

    /// Re-queue the slot now
    ///
    /// Dropping the view does the same; this only makes the hand-back
    /// explicit at call sites.
    pub fn release(self) {}
}

impl Drop for FrameView<'_> {
    fn drop(&mut self) {
        self.camera.outstanding -= 1;
        if let Some(stream) = self.camera.stream.as_mut() {
            if let Err(e) = stream.queue(self.index) {
                tracing::warn!(slot = self.index, error = %e, "buffer re-queue failed");
            }
        }
    }
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd belongs to `device`, which outlives both calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
