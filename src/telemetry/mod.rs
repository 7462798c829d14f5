//! # Telemetry Module
//!
//! The sender's acquisition/dispatch loop and the radio acknowledgement log.

pub mod ack_log;
pub mod pipeline;

pub use ack_log::AckLog;
pub use pipeline::{CycleReport, DeliveryOutcome, TelemetryLoop};
