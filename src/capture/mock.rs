//! Scripted capture source for tests
//!
//! Cycles through a fixed list of frames and instruments the acquire/release
//! bracket so tests can assert that at most one view is ever outstanding.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{CaptureError, DeviceError};

use super::traits::VideoSource;

pub struct MockSource {
    frames: Vec<Vec<u8>>,
    cursor: usize,
    width: u32,
    height: u32,
    streaming: bool,
    closed: bool,
    not_ready_left: u32,
    outstanding: Arc<AtomicU32>,
    max_outstanding: Arc<AtomicU32>,
    grabs: Arc<AtomicU32>,
}

impl MockSource {
    pub fn new(width: u32, height: u32, frames: Vec<Vec<u8>>) -> Self {
        assert!(!frames.is_empty());
        Self {
            frames,
            cursor: 0,
            width,
            height,
            streaming: false,
            closed: false,
            not_ready_left: 0,
            outstanding: Arc::new(AtomicU32::new(0)),
            max_outstanding: Arc::new(AtomicU32::new(0)),
            grabs: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A source that is already streaming
    pub fn streaming(width: u32, height: u32, frames: Vec<Vec<u8>>) -> Self {
        let mut source = Self::new(width, height, frames);
        source.streaming = true;
        source
    }

    /// Report `NotReady` for the first `n` acquisition attempts
    pub fn not_ready_first(mut self, n: u32) -> Self {
        self.not_ready_left = n;
        self
    }

    /// Live view counter, shared with the test
    pub fn outstanding(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.outstanding)
    }

    /// High-water mark of the live view counter
    pub fn max_outstanding(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.max_outstanding)
    }

    /// Number of successful acquisitions
    pub fn grabs(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.grabs)
    }
}

impl VideoSource for MockSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        self.streaming = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        self.streaming = false;
        Ok(())
    }

    fn with_frame(&mut self, visit: &mut dyn FnMut(&[u8])) -> Result<(), CaptureError> {
        if self.closed {
            return Err(DeviceError::Closed.into());
        }
        if !self.streaming {
            return Err(DeviceError::NotStreaming.into());
        }
        if self.not_ready_left > 0 {
            self.not_ready_left -= 1;
            return Err(CaptureError::NotReady);
        }

        let live = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(live, Ordering::SeqCst);
        assert_eq!(live, 1, "second acquisition while a view is outstanding");

        let frame = &self.frames[self.cursor % self.frames.len()];
        self.cursor += 1;
        visit(frame);

        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.grabs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.streaming = false;
    }
}
