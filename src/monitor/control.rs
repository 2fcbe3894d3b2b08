//! Control input loop
//!
//! Consumes the external touch-point source and maps points through a
//! rectangular button layout: one region triggers a snapshot broadcast, the
//! other requests shutdown. Broadcast failures end nothing; only the quit
//! region (or the running flag) ends the loop.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::sync::watch;

use crate::capture::VideoSource;
use crate::server::Broadcaster;

/// A point reported by the touch surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: u32,
    pub y: u32,
}

/// Blocking touch-point contract of the input device
pub trait TouchInput: Send {
    /// Wait for the next touch point
    fn next_point(&mut self) -> impl Future<Output = io::Result<TouchPoint>> + Send;
}

/// Axis-aligned button region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Whether a touch point falls inside this region
    pub fn contains(&self, point: TouchPoint) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Command derived from a touch point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Broadcast the current frame to all subscribers
    Snapshot,
    /// Wind the system down
    Quit,
}

/// Button regions on the control surface
///
/// Defaults match an 800x480 panel with the live view on the left and a
/// 160-wide button column on the right: snapshot on top, quit below.
#[derive(Debug, Clone, Copy)]
pub struct ControlLayout {
    pub snapshot: Region,
    pub quit: Region,
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self {
            snapshot: Region {
                x: 640,
                y: 0,
                width: 160,
                height: 240,
            },
            quit: Region {
                x: 640,
                y: 240,
                width: 160,
                height: 240,
            },
        }
    }
}

impl ControlLayout {
    /// Map a touch point to a command, if it hit a button
    pub fn command_at(&self, point: TouchPoint) -> Option<ControlCommand> {
        if self.quit.contains(point) {
            Some(ControlCommand::Quit)
        } else if self.snapshot.contains(point) {
            Some(ControlCommand::Snapshot)
        } else {
            None
        }
    }
}

/// Drives broadcasts and shutdown from touch input
pub struct ControlLoop<T, S> {
    touch: T,
    layout: ControlLayout,
    broadcaster: Broadcaster<S>,
    poll_interval: Duration,
}

impl<T: TouchInput, S: VideoSource> ControlLoop<T, S> {
    /// Create a control loop
    pub fn new(touch: T, layout: ControlLayout, broadcaster: Broadcaster<S>) -> Self {
        Self {
            touch,
            layout,
            broadcaster,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Replace the pacing between input polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until quit is requested or the running flag goes false
    pub async fn run(mut self, mut running: watch::Receiver<bool>) {
        tracing::info!("control loop started");

        loop {
            if !*running.borrow() {
                break;
            }

            let point = tokio::select! {
                _ = running.changed() => continue,
                point = self.touch.next_point() => match point {
                    Ok(point) => point,
                    Err(e) => {
                        tracing::warn!(error = %e, "touch source failed, requesting shutdown");
                        break;
                    }
                },
            };

            tracing::debug!(x = point.x, y = point.y, "touch");

            match self.layout.command_at(point) {
                Some(ControlCommand::Quit) => {
                    tracing::info!("quit requested");
                    break;
                }
                Some(ControlCommand::Snapshot) => {
                    if let Err(e) = self.broadcaster.broadcast().await {
                        tracing::warn!(error = %e, "snapshot broadcast failed");
                    }
                }
                None => {}
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!("control loop exited");
    }
}
