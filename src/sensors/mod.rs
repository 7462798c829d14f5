//! # Sensors Module
//!
//! The two acquisition sources of each cycle.
//!
//! This module handles:
//! - Time-bounded inertial sampling ([`imu::InertialSource`])
//! - The BNO08x I²C driver behind the [`imu::InertialSensor`] seam
//! - NMEA `$GPGGA` parsing and time-bounded fix acquisition ([`gps::PositionSource`])

pub mod bno08x;
pub mod gps;
pub mod imu;

pub use gps::{PositionFix, PositionSource};
pub use imu::{InertialSample, InertialSensor, InertialSource};
