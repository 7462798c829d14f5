//! # Record Module
//!
//! The fourteen-field telemetry record and the builder that assembles it.
//!
//! This module handles:
//! - The fixed-shape [`SensorReading`] type
//! - Field names shared by the wire format, archive header and display
//! - Merging inertial and position samples with unavailable defaults

pub mod builder;
pub mod reading;

pub use builder::RecordBuilder;
pub use reading::{SensorReading, FIELD_COUNT, FIELD_NAMES, UNAVAILABLE};
