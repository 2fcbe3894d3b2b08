//! Render loop
//!
//! Pulls frames through the shared camera at roughly 20 fps and paints them
//! onto a [`PixelSink`]. Every frame goes through the serializer, so
//! rendering never interleaves with a concurrent snapshot capture.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::capture::{SharedCamera, VideoSource};
use crate::error::CaptureError;
use crate::media::{yuyv_to_rgb_into, RGB_BYTES_PER_PIXEL};

use super::{pack_rgb, PixelSink};

/// Paints captured frames onto a pixel sink
pub struct Renderer<S, D> {
    camera: Arc<SharedCamera<S>>,
    sink: D,
    origin: (u32, u32),
    frame_interval: Duration,
    retry_delay: Duration,
    rgb: Vec<u8>,
    frames: u64,
}

impl<S: VideoSource, D: PixelSink> Renderer<S, D> {
    /// Create a renderer painting at the surface origin
    pub fn new(camera: Arc<SharedCamera<S>>, sink: D) -> Self {
        let rgb = vec![0u8; camera.width() as usize * camera.height() as usize * RGB_BYTES_PER_PIXEL];

        Self {
            camera,
            sink,
            origin: (0, 0),
            frame_interval: Duration::from_millis(50),
            retry_delay: Duration::from_millis(10),
            rgb,
            frames: 0,
        }
    }

    /// Paint with the top-left corner at `(x, y)`
    pub fn at_origin(mut self, x: u32, y: u32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Replace the frame pacing and the no-frame back-off
    pub fn with_timing(mut self, frame_interval: Duration, retry_delay: Duration) -> Self {
        self.frame_interval = frame_interval;
        self.retry_delay = retry_delay;
        self
    }

    /// Frames painted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Pull one frame and paint it
    pub async fn render_once(&mut self) -> Result<(), CaptureError> {
        let width = self.camera.width();
        let height = self.camera.height();
        let (x0, y0) = self.origin;
        let rgb = &mut self.rgb;
        let sink = &mut self.sink;

        self.camera
            .with_frame(|yuyv| {
                yuyv_to_rgb_into(yuyv, width, height, rgb);
                for y in 0..height {
                    for x in 0..width {
                        let i = ((y * width + x) as usize) * RGB_BYTES_PER_PIXEL;
                        sink.set_pixel(x0 + x, y0 + y, pack_rgb(rgb[i], rgb[i + 1], rgb[i + 2]));
                    }
                }
            })
            .await?;

        self.frames += 1;
        Ok(())
    }

    /// Run until the running flag goes false
    ///
    /// Paints at the configured pace, backs off briefly when no frame is
    /// ready, and keeps going through device errors; the flag is the only
    /// way out. Returns the sink.
    pub async fn run(mut self, mut running: watch::Receiver<bool>) -> D {
        tracing::info!("render loop started");

        loop {
            if !*running.borrow() {
                break;
            }

            let pause = match self.render_once().await {
                Ok(()) => self.frame_interval,
                Err(CaptureError::NotReady) => self.retry_delay,
                Err(CaptureError::Device(e)) => {
                    tracing::warn!(error = %e, "render frame failed");
                    self.frame_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = running.changed() => {}
            }
        }

        tracing::info!(frames = self.frames, "render loop exited");
        self.sink
    }
}
