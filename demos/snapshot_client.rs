//! Snapshot subscriber demo
//!
//! Run with: cargo run --example snapshot_client [SERVER_ADDR]
//!
//! Examples:
//!   cargo run --example snapshot_client                   # 127.0.0.1:8888
//!   cargo run --example snapshot_client 192.168.1.100:8888
//!
//! Connects to a running monitor, waits for snapshot broadcasts and saves
//! every received frame as `frame_NNNN.ppm` next to the working directory.
//! Ctrl+C exits.

use std::io::Write;

use framecast::media::yuyv_to_rgb;
use framecast::SnapshotClient;

fn save_ppm(path: &str, rgb: &[u8], width: u32, height: u32) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write!(file, "P6\n{} {}\n255\n", width, height)?;
    file.write_all(rgb)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8888".to_string())
        .parse()?;

    let mut client = SnapshotClient::connect(addr).await?;
    println!("Connected to {}; waiting for snapshots (Ctrl+C to exit)", addr);

    let mut frame_count = 0u32;
    loop {
        let packet = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            packet = client.recv() => match packet {
                Ok(packet) => packet,
                Err(e) => {
                    eprintln!("receive failed: {}", e);
                    break;
                }
            },
        };

        frame_count += 1;
        let header = packet.header;
        println!(
            "snapshot #{}: {}x{} format={} {} bytes (t={})",
            frame_count,
            header.width,
            header.height,
            header.format,
            header.payload_len,
            header.timestamp,
        );

        let rgb = yuyv_to_rgb(&packet.payload, header.width, header.height);
        let path = format!("frame_{:04}.ppm", frame_count);
        match save_ppm(&path, &rgb, header.width, header.height) {
            Ok(()) => println!("saved {}", path),
            Err(e) => eprintln!("saving {} failed: {}", path, e),
        }
    }

    println!("received {} snapshots", frame_count);
    Ok(())
}
