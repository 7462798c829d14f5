//! # Record Builder
//!
//! Merges one inertial sample and one position fix into a [`SensorReading`].

use super::reading::SensorReading;
use crate::sensors::gps::PositionFix;
use crate::sensors::imu::InertialSample;

/// Builds complete records from the two source samples of one cycle.
///
/// Pure merge: no I/O, no retries. A missing source turns every field it
/// owns into the unavailable marker; the other source's fields are untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordBuilder;

impl RecordBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Merge the cycle's samples into one reading
    ///
    /// # Examples
    ///
    /// ```
    /// use imu_gps_relay::record::RecordBuilder;
    ///
    /// let reading = RecordBuilder::new().build(None, None);
    /// assert!(reading.gyro_x.is_none());
    /// assert!(reading.gps_time.is_none());
    /// ```
    pub fn build(
        &self,
        inertial: Option<&InertialSample>,
        fix: Option<&PositionFix>,
    ) -> SensorReading {
        let [gyro_x, gyro_y, gyro_z] = split(inertial.map(|s| s.angular_rate));
        let [accel_x, accel_y, accel_z] = split(inertial.map(|s| s.acceleration));
        let [mag_x, mag_y, mag_z] = split(inertial.map(|s| s.magnetic_field));

        SensorReading {
            gyro_x,
            gyro_y,
            gyro_z,
            accel_x,
            accel_y,
            accel_z,
            mag_x,
            mag_y,
            mag_z,
            gps_time: fix.and_then(|f| f.time.clone()),
            gps_latitude: fix.and_then(|f| f.latitude.clone()),
            gps_longitude: fix.and_then(|f| f.longitude.clone()),
            gps_altitude: fix.and_then(|f| f.altitude.clone()),
            gps_satellites: fix.and_then(|f| f.satellites.clone()),
        }
    }
}

fn split(vector: Option<[f64; 3]>) -> [Option<f64>; 3] {
    match vector {
        Some([x, y, z]) => [Some(x), Some(y), Some(z)],
        None => [None; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::gps::parse_gga;

    fn sample() -> InertialSample {
        InertialSample {
            angular_rate: [0.01, 0.02, 0.03],
            acceleration: [0.1, 0.2, 9.8],
            magnetic_field: [10.0, 20.0, 30.0],
        }
    }

    #[test]
    fn test_build_with_both_sources() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
            .unwrap();
        let reading = RecordBuilder::new().build(Some(&sample()), Some(&fix));

        assert_eq!(reading.gyro_x, Some(0.01));
        assert_eq!(reading.accel_z, Some(9.8));
        assert_eq!(reading.mag_y, Some(20.0));
        assert_eq!(reading.gps_time.as_deref(), Some("123519"));
        assert_eq!(reading.gps_latitude.as_deref(), Some("4807.038"));
        assert_eq!(reading.gps_longitude.as_deref(), Some("01131.000"));
        assert_eq!(reading.gps_altitude.as_deref(), Some("545.4"));
        assert_eq!(reading.gps_satellites.as_deref(), Some("08"));
    }

    #[test]
    fn test_missing_fix_leaves_inertial_fields_untouched() {
        let reading = RecordBuilder::new().build(Some(&sample()), None);

        assert!(reading.has_inertial());
        assert!(!reading.has_position());
        assert_eq!(reading.gyro_z, Some(0.03));
        assert_eq!(reading.gps_time, None);
        assert_eq!(reading.gps_satellites, None);
    }

    #[test]
    fn test_missing_inertial_sample_marks_all_nine_unavailable() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
            .unwrap();
        let reading = RecordBuilder::new().build(None, Some(&fix));

        assert!(!reading.has_inertial());
        assert_eq!(reading.gps_altitude.as_deref(), Some("545.4"));
    }

    #[test]
    fn test_zero_measurements_are_kept() {
        let zeros = InertialSample {
            angular_rate: [0.0; 3],
            acceleration: [0.0; 3],
            magnetic_field: [0.0; 3],
        };
        let reading = RecordBuilder::new().build(Some(&zeros), None);

        assert_eq!(reading.gyro_x, Some(0.0));
        assert_eq!(reading.mag_z, Some(0.0));
    }
}
