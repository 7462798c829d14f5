//! # Sensor Reading
//!
//! Fixed-shape record of one acquisition cycle.

use serde::{Deserialize, Serialize};

/// Marker rendered for a field with no measurement (archive rows, display)
pub const UNAVAILABLE: &str = "N/A";

/// Number of logical fields in every record
pub const FIELD_COUNT: usize = 14;

/// Wire and archive field names, in encoding order
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "IMU_Gyro_X",
    "IMU_Gyro_Y",
    "IMU_Gyro_Z",
    "IMU_Accel_X",
    "IMU_Accel_Y",
    "IMU_Accel_Z",
    "IMU_Magnetic_X",
    "IMU_Magnetic_Y",
    "IMU_Magnetic_Z",
    "GPS_Time",
    "GPS_Latitude",
    "GPS_Longitude",
    "GPS_Altitude",
    "GPS_Satellites",
];

/// One merged inertial + position observation.
///
/// Every field is independently optional; `None` is the unavailable marker and
/// is distinct from a measured zero. Positional fields keep the receiver's raw
/// text verbatim (e.g. latitude `"4807.038"`), conversion to decimal degrees is
/// left to the consumer.
///
/// Field declaration order is the wire order. Missing fields on decode are
/// treated as unavailable, unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Angular rate X (rad/s)
    #[serde(rename = "IMU_Gyro_X", default)]
    pub gyro_x: Option<f64>,
    /// Angular rate Y (rad/s)
    #[serde(rename = "IMU_Gyro_Y", default)]
    pub gyro_y: Option<f64>,
    /// Angular rate Z (rad/s)
    #[serde(rename = "IMU_Gyro_Z", default)]
    pub gyro_z: Option<f64>,

    /// Acceleration X (m/s²)
    #[serde(rename = "IMU_Accel_X", default)]
    pub accel_x: Option<f64>,
    /// Acceleration Y (m/s²)
    #[serde(rename = "IMU_Accel_Y", default)]
    pub accel_y: Option<f64>,
    /// Acceleration Z (m/s²)
    #[serde(rename = "IMU_Accel_Z", default)]
    pub accel_z: Option<f64>,

    /// Magnetic field X (µT)
    #[serde(rename = "IMU_Magnetic_X", default)]
    pub mag_x: Option<f64>,
    /// Magnetic field Y (µT)
    #[serde(rename = "IMU_Magnetic_Y", default)]
    pub mag_y: Option<f64>,
    /// Magnetic field Z (µT)
    #[serde(rename = "IMU_Magnetic_Z", default)]
    pub mag_z: Option<f64>,

    /// UTC time of fix, raw `hhmmss[.sss]`
    #[serde(rename = "GPS_Time", default)]
    pub gps_time: Option<String>,
    /// Raw latitude field, `DDMM.mmmm`
    #[serde(rename = "GPS_Latitude", default)]
    pub gps_latitude: Option<String>,
    /// Raw longitude field, `DDDMM.mmmm`
    #[serde(rename = "GPS_Longitude", default)]
    pub gps_longitude: Option<String>,
    /// Raw altitude field (metres above mean sea level)
    #[serde(rename = "GPS_Altitude", default)]
    pub gps_altitude: Option<String>,
    /// Raw satellites-in-use field
    #[serde(rename = "GPS_Satellites", default)]
    pub gps_satellites: Option<String>,
}

impl SensorReading {
    /// Render all fourteen fields as text, in [`FIELD_NAMES`] order.
    ///
    /// Unavailable fields render as [`UNAVAILABLE`].
    pub fn rendered_fields(&self) -> [String; FIELD_COUNT] {
        fn num(value: Option<f64>) -> String {
            value.map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
        }
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_else(|| UNAVAILABLE.to_string())
        }

        [
            num(self.gyro_x),
            num(self.gyro_y),
            num(self.gyro_z),
            num(self.accel_x),
            num(self.accel_y),
            num(self.accel_z),
            num(self.mag_x),
            num(self.mag_y),
            num(self.mag_z),
            text(&self.gps_time),
            text(&self.gps_latitude),
            text(&self.gps_longitude),
            text(&self.gps_altitude),
            text(&self.gps_satellites),
        ]
    }

    /// True if any inertial field carries a measurement
    pub fn has_inertial(&self) -> bool {
        [
            self.gyro_x, self.gyro_y, self.gyro_z,
            self.accel_x, self.accel_y, self.accel_z,
            self.mag_x, self.mag_y, self.mag_z,
        ]
        .iter()
        .any(Option::is_some)
    }

    /// True if any positional field carries a value
    pub fn has_position(&self) -> bool {
        [
            &self.gps_time,
            &self.gps_latitude,
            &self.gps_longitude,
            &self.gps_altitude,
            &self.gps_satellites,
        ]
        .iter()
        .any(|f| f.is_some())
    }
}
