//! # Serial Communication Module
//!
//! Opens the UARTs used by the relay.
//!
//! This module handles:
//! - Opening serial ports 8N1 at the configured baud rate
//! - Trying candidate device paths in order
//! - Auto-detecting USB serial adapters on the consumer side
//! - The [`port_trait::SerialPortIO`] seam used by transports and tests

pub mod lines;
pub mod port_trait;

use crate::error::{RelayError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub use lines::LineReader;
pub use port_trait::{SerialPortIO, TokioSerialPort};

/// Baud rate of the deployed serial link, receiver and radio modem
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// An opened serial device
pub struct SerialDevice {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyS0)
    device_path: String,
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialDevice {
    /// Open a serial device
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyS0")
    /// * `baud_rate` - Line speed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imu_gps_relay::serial::SerialDevice;
    ///
    /// let gps = SerialDevice::open("/dev/ttyS0", 9600)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate)
    }

    /// Open the first device that succeeds from a list of candidates
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0", "/dev/ttyUSB1"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::SerialPortNotFound`] listing every path tried
    /// with its failure. Per-path failures are only logged at debug level
    /// since reconnecting transports call this every cycle.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        let mut failures = Vec::with_capacity(paths.len());

        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened serial device at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    debug!("Failed to open {}: {}", path, e);
                    failures.push(format!("{} ({})", path, e));
                }
            }
        }

        Err(RelayError::SerialPortNotFound(failures.join(", ")))
    }

    /// Open a specific serial port 8N1 without flow control
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RelayError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Hand the port to a transport
    pub fn into_port(self) -> TokioSerialPort {
        TokioSerialPort::new(self.port)
    }

    /// Hand the raw async stream to a reader
    pub fn into_stream(self) -> tokio_serial::SerialStream {
        self.port
    }
}

/// List serial devices whose path starts with `prefix`, sorted by name
///
/// Used by the consumer to find its USB serial adapter (e.g. `/dev/ttyUSB`).
pub fn detect_ports(prefix: &str) -> Vec<String> {
    let mut ports: Vec<String> = match tokio_serial::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| p.port_name)
            .filter(|name| name.starts_with(prefix))
            .collect(),
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    };

    // Deterministic choice when several adapters are present
    ports.sort();
    ports
}
