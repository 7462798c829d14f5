//! # IMU GPS Relay Library
//!
//! Acquire inertial and position data, and relay it over serial and radio links.
//!
//! This library provides the sensor readers, the record format and codec, the
//! transports, the CSV archive and the acquisition loop used by the
//! `imu-gps-relay` sender, plus the display side used by `relay-monitor`.

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod record;
pub mod scheduler;
pub mod sensors;
pub mod serial;
pub mod telemetry;
pub mod transport;
