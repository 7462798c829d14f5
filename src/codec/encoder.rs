//! # Record Encoder
//!
//! Serializes a [`SensorReading`] into the JSON wire record.

use bytes::Bytes;

use crate::error::Result;
use crate::record::SensorReading;

/// One encoded wire record.
///
/// Immutable once produced; clones share the same buffer, so every transport
/// sees the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord(Bytes);

impl EncodedRecord {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for EncodedRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a reading as a single-line JSON object.
///
/// Keys appear in the fixed wire order and every field is always present;
/// unavailable fields are `null`. The output contains no newline, framing is
/// up to each transport.
///
/// # Examples
///
/// ```
/// use imu_gps_relay::codec::encoder::encode_record;
/// use imu_gps_relay::record::SensorReading;
///
/// let record = encode_record(&SensorReading::default())?;
/// let text = std::str::from_utf8(record.as_bytes())?;
/// assert!(text.starts_with("{\"IMU_Gyro_X\":null"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encode_record(reading: &SensorReading) -> Result<EncodedRecord> {
    let json = serde_json::to_vec(reading)?;
    Ok(EncodedRecord(Bytes::from(json)))
}
