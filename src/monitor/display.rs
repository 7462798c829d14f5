//! Display formatting for received records.

use std::fmt;

use crate::record::{SensorReading, FIELD_COUNT, FIELD_NAMES, UNAVAILABLE};

/// Human-readable label for each wire field, in wire order
pub const FIELD_LABELS: [&str; FIELD_COUNT] = [
    "Gyro X (rad/s)",
    "Gyro Y (rad/s)",
    "Gyro Z (rad/s)",
    "Accel X (m/s²)",
    "Accel Y (m/s²)",
    "Accel Z (m/s²)",
    "Mag X (µT)",
    "Mag Y (µT)",
    "Mag Z (µT)",
    "Time (UTC)",
    "Latitude",
    "Longitude",
    "Altitude (m)",
    "Satellites",
];

const TIME_INDEX: usize = 9;
const LATITUDE_INDEX: usize = 10;
const LONGITUDE_INDEX: usize = 11;

/// Which axis a raw coordinate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// Connection state of the consumer's serial link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connected(String),
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected(_))
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Disconnected => write!(f, "disconnected"),
            LinkStatus::Connected(device) => write!(f, "connected ({})", device),
        }
    }
}

/// Snapshot shown by the consumer: fourteen formatted fields plus link state
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    values: [String; FIELD_COUNT],
    pub records_received: u64,
    pub link: LinkStatus,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| UNAVAILABLE.to_string()),
            records_received: 0,
            link: LinkStatus::Disconnected,
        }
    }
}

impl DisplayState {
    /// Replace every field with the formatted values of `reading`
    pub fn apply(&mut self, reading: &SensorReading) {
        let mut values = reading.rendered_fields();

        if let Some(time) = reading.gps_time.as_deref() {
            values[TIME_INDEX] = format_gps_time(time);
        }
        if let Some(lat) = reading.gps_latitude.as_deref() {
            values[LATITUDE_INDEX] = format_coordinate(lat, Axis::Latitude);
        }
        if let Some(lon) = reading.gps_longitude.as_deref() {
            values[LONGITUDE_INDEX] = format_coordinate(lon, Axis::Longitude);
        }

        self.values = values;
        self.records_received += 1;
    }

    /// Formatted value for a wire field name
    pub fn value(&self, field: &str) -> Option<&str> {
        FIELD_NAMES
            .iter()
            .position(|name| *name == field)
            .map(|i| self.values[i].as_str())
    }

    /// `(label, value)` pairs in wire order
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, &str)> {
        FIELD_LABELS
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }
}

/// `"hhmmss[.sss]"` to `"hh:mm:ss"`; anything shorter is returned raw
pub fn format_gps_time(raw: &str) -> String {
    match (raw.get(0..2), raw.get(2..4), raw.get(4..6)) {
        (Some(h), Some(m), Some(s)) => format!("{}:{}:{}", h, m, s),
        _ => raw.to_string(),
    }
}

/// Degrees-and-decimal-minutes to decimal degrees with a hemisphere letter.
///
/// The degree part is every digit before the two whole-minute digits, so
/// `"4807.038"` is 48° 07.038' and `"01131.000"` is 11° 31.000'. Values that
/// do not parse are returned raw.
pub fn format_coordinate(raw: &str, axis: Axis) -> String {
    let Some(decimal) = to_decimal_degrees(raw) else {
        return raw.to_string();
    };

    let hemisphere = match (axis, decimal >= 0.0) {
        (Axis::Latitude, true) => 'N',
        (Axis::Latitude, false) => 'S',
        (Axis::Longitude, true) => 'E',
        (Axis::Longitude, false) => 'W',
    };

    format!("{:.6}° {}", decimal.abs(), hemisphere)
}

fn to_decimal_degrees(raw: &str) -> Option<f64> {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, raw),
    };

    if !digits.is_ascii() {
        return None;
    }

    let whole_len = digits.find('.').unwrap_or(digits.len());
    if whole_len < 3 {
        return None;
    }

    let degrees: f64 = digits[..whole_len - 2].parse().ok()?;
    let minutes: f64 = digits[whole_len - 2..].parse().ok()?;
    if !(0.0..60.0).contains(&minutes) {
        return None;
    }

    Some(sign * (degrees + minutes / 60.0))
}
