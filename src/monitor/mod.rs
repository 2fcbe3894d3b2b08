//! Video monitor orchestration
//!
//! Wires the whole system together: camera → shared serializer → {local
//! renderer | snapshot cache} → broadcaster → registry → subscriber sockets.
//! Bring-up order is camera, server, render loop, control loop; tear-down
//! is cooperative (a shared running flag plus cancelled accepts), with a
//! bounded grace period before stragglers are aborted.

pub mod control;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capture::{Camera, CameraConfig, SharedCamera};
use crate::display::{PixelSink, Renderer};
use crate::error::Result;
use crate::server::{Broadcaster, ServerConfig, SnapshotServer};
use crate::stats::StatsSnapshot;

pub use control::{ControlCommand, ControlLayout, ControlLoop, Region, TouchInput, TouchPoint};

/// Monitor configuration options
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Capture device setup
    pub camera: CameraConfig,

    /// Snapshot server setup
    pub server: ServerConfig,

    /// Control surface button layout
    pub layout: ControlLayout,

    /// Top-left corner of the live view on the display surface
    pub origin: (u32, u32),

    /// Pacing of the render loop (~20 fps)
    pub frame_interval: Duration,

    /// Back-off when the ring has no frame ready
    pub retry_delay: Duration,

    /// Pacing of the control input loop
    pub poll_interval: Duration,

    /// How long shutdown waits for loops to exit before aborting them
    pub shutdown_grace: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            server: ServerConfig::default(),
            layout: ControlLayout::default(),
            origin: (0, 0),
            frame_interval: Duration::from_millis(50),
            retry_delay: Duration::from_millis(10),
            poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl MonitorConfig {
    /// Set the capture configuration
    pub fn camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Set the server configuration
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// Set the live-view origin on the display surface
    pub fn origin(mut self, x: u32, y: u32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// The assembled capture-render-broadcast system
pub struct VideoMonitor {
    config: MonitorConfig,
}

impl VideoMonitor {
    /// Create a monitor from configuration
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Bring the system up and run until quit is requested
    ///
    /// Returns after a complete tear-down. Initialization failures abort
    /// startup with nothing left open; a camera already opened is closed on
    /// any later bring-up failure.
    pub async fn run<D, T>(self, sink: D, touch: T) -> Result<StatsSnapshot>
    where
        D: PixelSink + 'static,
        T: TouchInput,
    {
        let config = self.config;

        let camera = Camera::open(&config.camera)?;
        let camera = Arc::new(SharedCamera::new(camera));
        if let Err(e) = camera.start().await {
            camera.close().await;
            return Err(e.into());
        }

        let server = Arc::new(SnapshotServer::new(config.server.clone()));
        let registry = Arc::clone(server.registry());
        let stats = Arc::clone(server.stats());
        let broadcaster = Broadcaster::new(Arc::clone(&camera), registry, Arc::clone(&stats));

        let (running_tx, running_rx) = watch::channel(true);

        let server_task: JoinHandle<Result<()>> = {
            let server = Arc::clone(&server);
            let mut flag = running_rx.clone();
            tokio::spawn(async move {
                server
                    .run_until(async move {
                        let _ = flag.wait_for(|running| !*running).await;
                    })
                    .await
            })
        };

        let render_task = {
            let renderer = Renderer::new(Arc::clone(&camera), sink)
                .at_origin(config.origin.0, config.origin.1)
                .with_timing(config.frame_interval, config.retry_delay);
            tokio::spawn(renderer.run(running_rx.clone()))
        };

        // The control loop runs here; its exit is the quit signal.
        ControlLoop::new(touch, config.layout, broadcaster)
            .with_poll_interval(config.poll_interval)
            .run(running_rx)
            .await;

        tracing::info!("tearing down");
        let _ = running_tx.send(false);

        join_with_grace("server", server_task, config.shutdown_grace).await;
        join_with_grace("renderer", render_task, config.shutdown_grace).await;

        // Monitors have been signalled; drop whatever they left behind so
        // every subscriber socket closes exactly once.
        server.registry().clear().await;

        if let Err(e) = camera.stop().await {
            tracing::warn!(error = %e, "camera stop failed during teardown");
        }
        camera.close().await;

        let snapshot = stats.snapshot();
        tracing::info!(
            connections = snapshot.total_connections,
            broadcasts = snapshot.broadcasts,
            frames_delivered = snapshot.frames_delivered,
            "video monitor exited"
        );
        Ok(snapshot)
    }
}

/// Wait for a task within the grace period, then abort it
async fn join_with_grace<O>(name: &str, mut task: JoinHandle<O>, grace: Duration) {
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!(task = name, error = %e, "task ended abnormally"),
        Err(_) => {
            // Last resort; the cooperative path is the running flag.
            tracing::warn!(task = name, "grace period expired, aborting task");
            task.abort();
            let _ = task.await;
        }
    }
}
