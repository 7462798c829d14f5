//! # Record Decoder
//!
//! Parses wire records back into [`SensorReading`]s on the consumer side.

use crate::error::{RelayError, Result};
use crate::record::SensorReading;

/// Decode one wire record.
///
/// Surrounding whitespace (including the serial line terminator) is ignored.
/// Unknown keys are ignored; missing keys decode as unavailable.
///
/// # Errors
///
/// Returns [`RelayError::Parse`] for an empty record and
/// [`RelayError::Decode`] for anything that is not a JSON object with
/// correctly typed fields.
pub fn decode_record(bytes: &[u8]) -> Result<SensorReading> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return Err(RelayError::Parse("empty record".to_string()));
    }

    let reading = serde_json::from_slice(trimmed)?;
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::encode_record;
    use crate::record::RecordBuilder;
    use crate::sensors::gps::parse_gga;
    use crate::sensors::imu::InertialSample;

    #[test]
    fn test_build_encode_decode_round_trip() {
        let sample = InertialSample {
            angular_rate: [0.01, -0.02, 1.0e-7],
            acceleration: [0.1, 0.2, 9.80665],
            magnetic_field: [-10.5, 20.0, 30.125],
        };
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");
        let reading = RecordBuilder::new().build(Some(&sample), fix.as_ref());

        let decoded = decode_record(encode_record(&reading).unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, reading);
        // Raw positional text is preserved, including leading zeros
        assert_eq!(decoded.gps_longitude.as_deref(), Some("01131.000"));
        assert_eq!(decoded.gps_satellites.as_deref(), Some("08"));
    }

    #[test]
    fn test_round_trip_without_fix() {
        let reading = SensorReading {
            gyro_x: Some(0.0),
            ..Default::default()
        };
        let decoded = decode_record(encode_record(&reading).unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_decode_accepts_line_terminator() {
        let decoded = decode_record(b"{\"GPS_Time\":\"123519\"}\r\n").unwrap();
        assert_eq!(decoded.gps_time.as_deref(), Some("123519"));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let decoded = decode_record(br#"{"IMU_Gyro_X":1.5,"Battery_V":11.1}"#).unwrap();
        assert_eq!(decoded.gyro_x, Some(1.5));
    }

    #[test]
    fn test_decode_missing_fields_are_unavailable() {
        // Legacy senders omitted the GPS keys entirely
        let decoded = decode_record(br#"{"IMU_Accel_Z":9.8}"#).unwrap();
        assert_eq!(decoded.accel_z, Some(9.8));
        assert!(!decoded.has_position());
    }

    #[test]
    fn test_decode_malformed_input() {
        assert!(matches!(decode_record(b"{\"IMU_Gyro_X\":"), Err(RelayError::Decode(_))));
        assert!(matches!(decode_record(b"[1,2,3]"), Err(RelayError::Decode(_))));
        assert!(matches!(decode_record(b"not json"), Err(RelayError::Decode(_))));
        assert!(matches!(decode_record(b"  \n"), Err(RelayError::Parse(_))));
    }

    #[test]
    fn test_decode_wrong_field_type() {
        let result = decode_record(br#"{"GPS_Time":123519}"#);
        assert!(matches!(result, Err(RelayError::Decode(_))));
    }
}
