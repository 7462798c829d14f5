//! # Wire Codec Module
//!
//! The self-describing wire format shared by sender and consumer.
//!
//! This module handles:
//! - Encoding a reading as one JSON object with fixed key order
//! - Decoding records on the consumer side, tolerating unknown and missing keys

pub mod decoder;
pub mod encoder;

pub use decoder::decode_record;
pub use encoder::{encode_record, EncodedRecord};
