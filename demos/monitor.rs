//! Video monitor demo with keyboard control
//!
//! Run with: cargo run --example monitor [DEVICE] [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example monitor                          # /dev/video0, 0.0.0.0:8888
//!   cargo run --example monitor /dev/video7              # board camera
//!   cargo run --example monitor /dev/video0 127.0.0.1:8890
//!
//! The demo runs headless: painted frames are counted instead of shown, and
//! the touch panel is replaced by stdin. Type `s` + Enter to broadcast a
//! snapshot to every connected subscriber, `q` + Enter (or Ctrl+C) to quit.
//!
//! Receive snapshots with the companion example:
//!   cargo run --example snapshot_client 127.0.0.1:8888

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use framecast::{
    CameraConfig, ControlLayout, MonitorConfig, PixelSink, ServerConfig, TouchInput, TouchPoint,
    VideoMonitor,
};

/// Counts plotted pixels instead of driving a real panel
struct HeadlessSink {
    plotted: Arc<AtomicU64>,
}

impl PixelSink for HeadlessSink {
    fn set_pixel(&mut self, _x: u32, _y: u32, _color: u32) {
        self.plotted.fetch_add(1, Ordering::Relaxed);
    }
}

/// Maps stdin commands onto the control surface button regions
struct StdinPanel {
    lines: Lines<BufReader<Stdin>>,
    layout: ControlLayout,
}

impl StdinPanel {
    fn new(layout: ControlLayout) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            layout,
        }
    }

    fn press(region: framecast::monitor::Region) -> TouchPoint {
        TouchPoint {
            x: region.x + region.width / 2,
            y: region.y + region.height / 2,
        }
    }
}

impl TouchInput for StdinPanel {
    async fn next_point(&mut self) -> io::Result<TouchPoint> {
        loop {
            match self.lines.next_line().await? {
                Some(line) => match line.trim() {
                    "s" => return Ok(Self::press(self.layout.snapshot)),
                    "q" => return Ok(Self::press(self.layout.quit)),
                    "" => continue,
                    other => {
                        println!("unknown command {:?} (use `s` or `q`)", other);
                    }
                },
                // stdin closed: behave like the quit button.
                None => return Ok(Self::press(self.layout.quit)),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| "/dev/video0".to_string());
    let bind_addr = args
        .next()
        .unwrap_or_else(|| "0.0.0.0:8888".to_string())
        .parse()?;

    let config = MonitorConfig::default()
        .camera(CameraConfig::with_path(device))
        .server(ServerConfig::with_addr(bind_addr));
    let layout = config.layout;

    let plotted = Arc::new(AtomicU64::new(0));
    let sink = HeadlessSink {
        plotted: Arc::clone(&plotted),
    };

    println!("Video monitor running");
    println!("  subscribers connect on {}", bind_addr);
    println!("  `s` + Enter broadcasts a snapshot, `q` + Enter quits");

    let stats = VideoMonitor::new(config)
        .run(sink, StdinPanel::new(layout))
        .await?;

    println!("Session summary:");
    println!("  pixels painted:    {}", plotted.load(Ordering::Relaxed));
    println!("  connections:       {}", stats.total_connections);
    println!("  broadcasts:        {}", stats.broadcasts);
    println!("  frames delivered:  {}", stats.frames_delivered);
    println!("  bytes sent:        {}", stats.bytes_sent);

    Ok(())
}
