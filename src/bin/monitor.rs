//! # Relay Monitor
//!
//! Ground-side display for records arriving on a USB serial adapter.
//!
//! Auto-detects the first `/dev/ttyUSB*` device, re-attaches when it
//! disappears, and redraws the terminal whenever a new snapshot is
//! published. Ctrl+C exits.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use imu_gps_relay::config::Config;
use imu_gps_relay::logging::Console;
use imu_gps_relay::monitor::{DisplayState, Monitor};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Clear screen and move the cursor home
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn render(state: &DisplayState) -> String {
    let mut out = String::from(CLEAR_SCREEN);
    out.push_str("IMU & GPS Data\n");
    out.push_str(&format!("Link: {}\n\n", state.link));
    for (label, value) in state.rows() {
        out.push_str(&format!("{:<16}{}\n", format!("{}:", label), value));
    }
    out.push_str(&format!("\nRecords received: {}\n", state.records_received));
    out
}

async fn draw(mut rx: watch::Receiver<DisplayState>) {
    loop {
        let frame = render(&rx.borrow_and_update());
        {
            // Terminal write errors are ignored
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(frame.as_bytes()).and_then(|()| stdout.flush());
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // stdout belongs to the display
    let console = Console::for_display(&config.logging);
    let _log_guard = imu_gps_relay::logging::init(&config.logging, console);
    info!("Relay Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut monitor = Monitor::new(&config.monitor);
    let renderer = tokio::spawn(draw(monitor.subscribe()));

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await;

    drop(monitor);
    let _ = renderer.await;
    Ok(())
}
