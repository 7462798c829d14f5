//! # IMU GPS Relay
//!
//! Acquire one inertial sample and one position fix per cycle, then relay the
//! record over the wired serial link and the packet radio, and archive it.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first CLI argument, or `config/default.toml`)
//!    - Set up logging
//!    - Open the positioning receiver and the inertial sensor
//!    - Connect the transports and open the archive
//!
//! 2. **Main Loop**
//!    - One acquisition/dispatch cycle per period
//!    - Failed transports are retried at the start of later cycles
//!    - Log status every `status_interval_cycles` cycles
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C is honoured between cycles
//!    - Log total cycle count
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO imu_gps_relay: IMU GPS Relay v0.1.0 starting...
//! INFO imu_gps_relay::serial: Opened serial device at /dev/ttyS0 (9600 baud)
//! INFO imu_gps_relay: Starting acquisition loop (1000 ms period)
//! INFO imu_gps_relay::telemetry::pipeline: Completed 60 cycles (120 deliveries, last cycle 2/2 transports)
//! ```

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;

use imu_gps_relay::archive::CsvArchive;
use imu_gps_relay::config::Config;
use imu_gps_relay::logging::Console;
use imu_gps_relay::scheduler::IntervalTicker;
use imu_gps_relay::sensors::bno08x::Bno08x;
use imu_gps_relay::sensors::{InertialSource, PositionSource};
use imu_gps_relay::serial::{SerialDevice, SerialPortIO};
use imu_gps_relay::telemetry::{AckLog, TelemetryLoop};
use imu_gps_relay::transport::{RadioLink, RadioTransport, SerialRadio, SerialTransport};

/// Configuration used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = imu_gps_relay::logging::init(&config.logging, Console::Stdout);

    info!("IMU GPS Relay v{} starting...", env!("CARGO_PKG_VERSION"));

    // Sensors: both are required at startup
    let gps = SerialDevice::open(&config.gps.port, config.gps.baud_rate)
        .context("Positioning receiver unavailable")?;
    let position = PositionSource::new(BufReader::new(gps.into_stream()), config.gps.fix_timeout());

    let imu = Bno08x::open(config.imu.i2c_bus, config.imu.address, config.imu.report_interval())
        .context("Inertial sensor unavailable")?;
    let inertial = InertialSource::new(imu, config.imu.sample_timeout());

    let mut telemetry = TelemetryLoop::new(inertial, position)
        .with_status_interval(config.telemetry.status_interval_cycles);

    // Wired serial link
    let serial_port = config.serial.port.clone();
    let serial_baud = config.serial.baud_rate;
    telemetry = telemetry.with_transport(Box::new(SerialTransport::connect(
        "serial",
        Box::new(move || {
            let device = SerialDevice::open(&serial_port, serial_baud)?;
            Ok(Box::new(device.into_port()) as Box<dyn SerialPortIO>)
        }),
        config.serial.write_timeout(),
    )));

    // Packet radio
    if config.radio.enabled {
        let radio_port = config.radio.port.clone();
        let radio_baud = config.radio.baud_rate;
        let max_packet_size = config.radio.max_packet_size;
        let ack_log = config.telemetry.ack_log_enabled.then(|| {
            AckLog::new(
                &config.telemetry.ack_log_dir,
                config.telemetry.max_records_per_file,
                config.telemetry.max_files_to_keep,
            )
        });

        let radio = RadioTransport::connect(
            "radio",
            Box::new(move || {
                let device = SerialDevice::open(&radio_port, radio_baud)?;
                let port: Box<dyn SerialPortIO> = Box::new(device.into_port());
                Ok(Box::new(SerialRadio::new(port, max_packet_size)) as Box<dyn RadioLink>)
            }),
            config.radio.settings(),
            ack_log,
        )?;
        telemetry = telemetry.with_transport(Box::new(radio));
    } else {
        info!("Radio transport disabled");
    }

    if config.archive.enabled {
        info!("Archiving to {}", config.archive.path);
        telemetry = telemetry.with_archive(Box::new(CsvArchive::new(&config.archive.path)));
    } else {
        info!("Archive disabled");
    }

    let mut ticker = IntervalTicker::new(config.telemetry.cycle_period());
    info!(
        "Starting acquisition loop ({} ms period)",
        config.telemetry.cycle_period_ms
    );
    info!("Press Ctrl+C to exit");

    let cycles = telemetry
        .run(&mut ticker, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await;

    info!("Total cycles completed: {}", cycles);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(path).unwrap();
        assert_eq!(config.gps.port, "/dev/ttyS0");
        assert_eq!(config.telemetry.cycle_period_ms, 1000);
    }
}
