//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{RelayError, Result};
use crate::transport::RadioSettings;

/// Baud rates accepted for every UART
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub radio: RadioConfig,
    pub gps: GpsConfig,
    pub imu: ImuConfig,
    pub archive: ArchiveConfig,
    pub telemetry: TelemetryConfig,
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wired serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_serial_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Radio modem configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_radio_enabled")]
    pub enabled: bool,

    #[serde(default = "default_radio_port")]
    pub port: String,

    #[serde(default = "default_radio_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,

    #[serde(default = "default_ack_window_ms")]
    pub ack_window_ms: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Positioning receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_gps_port")]
    pub port: String,

    #[serde(default = "default_gps_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_fix_timeout_ms")]
    pub fix_timeout_ms: u64,
}

/// Inertial sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    #[serde(default = "default_imu_address")]
    pub address: u16,

    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
}

/// CSV archive configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_enabled")]
    pub enabled: bool,

    #[serde(default = "default_archive_path")]
    pub path: String,
}

/// Acquisition loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    #[serde(default = "default_status_interval_cycles")]
    pub status_interval_cycles: u64,

    #[serde(default = "default_ack_log_enabled")]
    pub ack_log_enabled: bool,

    #[serde(default = "default_ack_log_dir")]
    pub ack_log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Consumer display configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_port_prefix")]
    pub port_prefix: String,

    #[serde(default = "default_monitor_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

/// Log file configuration; stdout logging is always on
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyAMA1".to_string() }
fn default_serial_baud_rate() -> u32 { 9600 }
fn default_write_timeout_ms() -> u64 { 1000 }

fn default_radio_enabled() -> bool { true }
fn default_radio_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_radio_baud_rate() -> u32 { 57600 }
fn default_max_packet_size() -> usize { 60 }
fn default_chunk_size() -> usize { 32 }
fn default_inter_chunk_delay_ms() -> u64 { 50 }
fn default_ack_window_ms() -> u64 { 100 }
fn default_send_timeout_ms() -> u64 { 1000 }

fn default_gps_port() -> String { "/dev/ttyS0".to_string() }
fn default_gps_baud_rate() -> u32 { 9600 }
fn default_fix_timeout_ms() -> u64 { 2000 }

fn default_i2c_bus() -> u8 { 1 }
fn default_imu_address() -> u16 { 0x4A }
fn default_report_interval_ms() -> u64 { 50 }
fn default_sample_timeout_ms() -> u64 { 200 }

fn default_archive_enabled() -> bool { true }
fn default_archive_path() -> String { "/media/sdcard/sensor_data.csv".to_string() }

fn default_cycle_period_ms() -> u64 { 1000 }
fn default_status_interval_cycles() -> u64 { 60 }
fn default_ack_log_enabled() -> bool { true }
fn default_ack_log_dir() -> String { "./logs/radio".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_port_prefix() -> String { "/dev/ttyUSB".to_string() }
fn default_monitor_baud_rate() -> u32 { 9600 }
fn default_check_interval_ms() -> u64 { 1000 }

fn default_file_prefix() -> String { "imu-gps-relay".to_string() }

fn invalid(message: impl std::fmt::Display) -> RelayError {
    RelayError::Config(toml::de::Error::custom(message))
}

fn check_millis(name: &str, value: u64) -> Result<()> {
    if value == 0 || value > 60000 {
        return Err(invalid(format!("{} must be between 1 and 60000", name)));
    }
    Ok(())
}

fn check_baud(name: &str, value: u32) -> Result<()> {
    if !SUPPORTED_BAUD_RATES.contains(&value) {
        return Err(invalid(format!(
            "{} must be one of: 9600, 19200, 38400, 57600, 115200",
            name
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imu_gps_relay::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Ports
        for (name, port) in [
            ("serial port", &self.serial.port),
            ("gps port", &self.gps.port),
            ("monitor port_prefix", &self.monitor.port_prefix),
        ] {
            if port.is_empty() {
                return Err(invalid(format!("{} cannot be empty", name)));
            }
        }

        if self.radio.enabled && self.radio.port.is_empty() {
            return Err(invalid("radio port cannot be empty when enabled"));
        }

        // Baud rates
        check_baud("serial baud_rate", self.serial.baud_rate)?;
        check_baud("radio baud_rate", self.radio.baud_rate)?;
        check_baud("gps baud_rate", self.gps.baud_rate)?;
        check_baud("monitor baud_rate", self.monitor.baud_rate)?;

        // Radio framing
        if self.radio.max_packet_size == 0 || self.radio.max_packet_size > 255 {
            return Err(invalid("max_packet_size must be between 1 and 255"));
        }

        if self.radio.chunk_size == 0 || self.radio.chunk_size > self.radio.max_packet_size {
            return Err(invalid("chunk_size must be between 1 and max_packet_size"));
        }

        if self.radio.inter_chunk_delay_ms > 60000 {
            return Err(invalid("inter_chunk_delay_ms must be between 0 and 60000"));
        }

        if self.radio.ack_window_ms > 60000 {
            return Err(invalid("ack_window_ms must be between 0 and 60000"));
        }

        // Timing fields
        check_millis("write_timeout_ms", self.serial.write_timeout_ms)?;
        check_millis("send_timeout_ms", self.radio.send_timeout_ms)?;
        check_millis("fix_timeout_ms", self.gps.fix_timeout_ms)?;
        check_millis("report_interval_ms", self.imu.report_interval_ms)?;
        check_millis("sample_timeout_ms", self.imu.sample_timeout_ms)?;
        check_millis("cycle_period_ms", self.telemetry.cycle_period_ms)?;
        check_millis("check_interval_ms", self.monitor.check_interval_ms)?;

        // 7-bit I2C address
        if self.imu.address > 0x7F {
            return Err(invalid("imu address must be a 7-bit I2C address"));
        }

        if self.archive.enabled && self.archive.path.is_empty() {
            return Err(invalid("archive path cannot be empty when enabled"));
        }

        // Ack log
        if self.telemetry.ack_log_enabled && self.telemetry.ack_log_dir.is_empty() {
            return Err(invalid("ack_log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.logging.file_prefix.is_empty() {
            return Err(invalid("logging file_prefix cannot be empty"));
        }

        Ok(())
    }
}

impl SerialConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl RadioConfig {
    /// Chunking and timing parameters for the radio transport
    pub fn settings(&self) -> RadioSettings {
        RadioSettings {
            chunk_size: self.chunk_size,
            inter_chunk_delay: Duration::from_millis(self.inter_chunk_delay_ms),
            ack_window: Duration::from_millis(self.ack_window_ms),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

impl GpsConfig {
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(self.fix_timeout_ms)
    }
}

impl ImuConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

impl TelemetryConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            serial: SerialConfig {
                port: default_serial_port(),
                baud_rate: default_serial_baud_rate(),
                write_timeout_ms: default_write_timeout_ms(),
            },
            radio: RadioConfig {
                enabled: default_radio_enabled(),
                port: default_radio_port(),
                baud_rate: default_radio_baud_rate(),
                max_packet_size: default_max_packet_size(),
                chunk_size: default_chunk_size(),
                inter_chunk_delay_ms: default_inter_chunk_delay_ms(),
                ack_window_ms: default_ack_window_ms(),
                send_timeout_ms: default_send_timeout_ms(),
            },
            gps: GpsConfig {
                port: default_gps_port(),
                baud_rate: default_gps_baud_rate(),
                fix_timeout_ms: default_fix_timeout_ms(),
            },
            imu: ImuConfig {
                i2c_bus: default_i2c_bus(),
                address: default_imu_address(),
                report_interval_ms: default_report_interval_ms(),
                sample_timeout_ms: default_sample_timeout_ms(),
            },
            archive: ArchiveConfig {
                enabled: default_archive_enabled(),
                path: default_archive_path(),
            },
            telemetry: TelemetryConfig {
                cycle_period_ms: default_cycle_period_ms(),
                status_interval_cycles: default_status_interval_cycles(),
                ack_log_enabled: default_ack_log_enabled(),
                ack_log_dir: default_ack_log_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
            },
            monitor: MonitorConfig {
                port_prefix: default_port_prefix(),
                baud_rate: default_monitor_baud_rate(),
                check_interval_ms: default_check_interval_ms(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyAMA0"

[radio]
enabled = false

[gps]

[imu]

[archive]

[telemetry]

[monitor]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert!(!config.radio.enabled);
        assert_eq!(config.gps.port, "/dev/ttyS0");
        assert_eq!(config.archive.path, "/media/sdcard/sensor_data.csv");
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_missing_section_is_error() {
        let result = Config::from_toml("[serial]\n");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/relay.toml");
        assert!(matches!(result, Err(RelayError::Io(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gps_port() {
        let mut config = create_valid_config();
        config.gps.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_radio_port_when_enabled() {
        let mut config = create_valid_config();
        config.radio.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_radio_port_when_disabled() {
        let mut config = create_valid_config();
        config.radio.enabled = false;
        config.radio.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            config.gps.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_chunk_size_zero() {
        let mut config = create_valid_config();
        config.radio.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chunk_size_above_max_packet_size() {
        let mut config = create_valid_config();
        config.radio.chunk_size = 61;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chunk_size_equal_to_max_packet_size() {
        let mut config = create_valid_config();
        config.radio.chunk_size = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_packet_size_too_high() {
        let mut config = create_valid_config();
        config.radio.max_packet_size = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_delay_and_ack_window_allowed() {
        let mut config = create_valid_config();
        config.radio.inter_chunk_delay_ms = 0;
        config.radio.ack_window_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ack_window_too_high() {
        let mut config = create_valid_config();
        config.radio.ack_window_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fix_timeout_zero() {
        let mut config = create_valid_config();
        config.gps.fix_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cycle_period_too_high() {
        let mut config = create_valid_config();
        config.telemetry.cycle_period_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_timeout_zero() {
        let mut config = create_valid_config();
        config.serial.write_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_timeout_zero() {
        let mut config = create_valid_config();
        config.imu.sample_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_interval_zero() {
        let mut config = create_valid_config();
        config.monitor.check_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_imu_address_out_of_range() {
        let mut config = create_valid_config();
        config.imu.address = 0x80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_archive_path_when_enabled() {
        let mut config = create_valid_config();
        config.archive.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_archive_path_when_disabled() {
        let mut config = create_valid_config();
        config.archive.enabled = false;
        config.archive.path = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_ack_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.ack_log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_radio_settings_conversion() {
        let settings = create_valid_config().radio.settings();
        assert_eq!(settings.chunk_size, 32);
        assert_eq!(settings.inter_chunk_delay, Duration::from_millis(50));
        assert_eq!(settings.ack_window, Duration::from_millis(100));
        assert_eq!(settings.send_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyAMA1");
        assert_eq!(default_serial_baud_rate(), 9600);
        assert_eq!(default_gps_port(), "/dev/ttyS0");
        assert_eq!(default_gps_baud_rate(), 9600);
        assert_eq!(default_fix_timeout_ms(), 2000);
        assert_eq!(default_imu_address(), 0x4A);
        assert_eq!(default_archive_path(), "/media/sdcard/sensor_data.csv");
        assert_eq!(default_cycle_period_ms(), 1000);
        assert_eq!(default_port_prefix(), "/dev/ttyUSB");
        assert_eq!(default_monitor_baud_rate(), 9600);
        assert_eq!(default_check_interval_ms(), 1000);
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
