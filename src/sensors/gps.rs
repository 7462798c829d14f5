//! # Position Source
//!
//! Reads the positioning receiver's NMEA stream and extracts `$GPGGA` fixes.
//!
//! ## Sentence Layout
//!
//! ```text
//! $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47
//!   0      1       2     3     4     5 6  7   8    9   10  11 12 13 14
//! ```
//!
//! | Index | Field |
//! |-------|-------|
//! | 1 | UTC time `hhmmss[.sss]` |
//! | 2 / 3 | Latitude `DDMM.mmmm` / N or S |
//! | 4 / 5 | Longitude `DDDMM.mmmm` / E or W |
//! | 6 | Fix quality |
//! | 7 | Satellites in use |
//! | 9 | Altitude (MSL) |
//!
//! Fields are kept as raw text. Any line that is not a well-formed `$GPGGA`
//! sentence is dropped without affecting the next fix.

use std::time::Duration;

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::serial::LineReader;

/// Longest valid NMEA 0183 sentence, `$` through `\r\n`
pub const MAX_SENTENCE_LEN: usize = 82;

/// Leading token of the only accepted sentence type
pub const GGA_IDENTIFIER: &str = "$GPGGA";

/// Number of comma-delimited fields in a `$GPGGA` sentence
pub const GGA_FIELD_COUNT: usize = 15;

const FIELD_TIME: usize = 1;
const FIELD_LATITUDE: usize = 2;
const FIELD_NS: usize = 3;
const FIELD_LONGITUDE: usize = 4;
const FIELD_EW: usize = 5;
const FIELD_QUALITY: usize = 6;
const FIELD_SATELLITES: usize = 7;
const FIELD_ALTITUDE: usize = 9;

/// Structured fix extracted from one `$GPGGA` sentence.
///
/// Empty receiver fields (no fix yet) are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionFix {
    pub time: Option<String>,
    pub latitude: Option<String>,
    pub ns: Option<String>,
    pub longitude: Option<String>,
    pub ew: Option<String>,
    pub quality: Option<String>,
    pub satellites: Option<String>,
    pub altitude: Option<String>,
}

/// Parse one line as a `$GPGGA` sentence.
///
/// Returns `None` for other sentence types, wrong field counts and checksum
/// mismatches. A `*hh` suffix is verified when present.
///
/// # Examples
///
/// ```
/// use imu_gps_relay::sensors::gps::parse_gga;
///
/// let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();
/// assert_eq!(fix.latitude.as_deref(), Some("4807.038"));
/// assert!(parse_gga("$GPRMC,123519,A,4807.038,N").is_none());
/// ```
pub fn parse_gga(line: &str) -> Option<PositionFix> {
    let line = line.trim();
    if !line.starts_with(GGA_IDENTIFIER) {
        return None;
    }

    if !checksum_matches(line) {
        debug!("Dropping GGA sentence with bad checksum: {}", line);
        return None;
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != GGA_FIELD_COUNT || fields[0] != GGA_IDENTIFIER {
        debug!("Dropping GGA sentence with {} fields: {}", fields.len(), line);
        return None;
    }

    let raw = |index: usize| -> Option<String> {
        let value = fields[index].trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    Some(PositionFix {
        time: raw(FIELD_TIME),
        latitude: raw(FIELD_LATITUDE),
        ns: raw(FIELD_NS),
        longitude: raw(FIELD_LONGITUDE),
        ew: raw(FIELD_EW),
        quality: raw(FIELD_QUALITY),
        satellites: raw(FIELD_SATELLITES),
        altitude: raw(FIELD_ALTITUDE),
    })
}

/// Verify an NMEA `*hh` checksum (XOR of the bytes between `$` and `*`).
///
/// Sentences without a checksum suffix pass.
fn checksum_matches(line: &str) -> bool {
    let Some((body, suffix)) = line.rsplit_once('*') else {
        return true;
    };

    let Ok(expected) = u8::from_str_radix(suffix.trim(), 16) else {
        return false;
    };

    let computed = body
        .strip_prefix('$')
        .unwrap_or(body)
        .bytes()
        .fold(0u8, |acc, b| acc ^ b);

    computed == expected
}

/// Positioning receiver wrapper.
///
/// Generic over any buffered async reader so the receiver UART and scripted
/// test streams share the same code path.
pub struct PositionSource<R> {
    reader: R,
    timeout: Duration,
    lines: LineReader,
    exhausted: bool,
}

impl<R> std::fmt::Debug for PositionSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionSource")
            .field("timeout", &self.timeout)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncBufRead + Unpin + Send> PositionSource<R> {
    /// Wrap a line-oriented receiver stream
    ///
    /// # Arguments
    ///
    /// * `reader` - Buffered NMEA byte stream
    /// * `timeout` - Upper bound on a single [`next_fix`](Self::next_fix) call
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self {
            reader,
            timeout,
            lines: LineReader::new(MAX_SENTENCE_LEN),
            exhausted: false,
        }
    }

    /// Wait for the next `$GPGGA` fix.
    ///
    /// Non-matching and malformed lines are skipped. Returns `None` once the
    /// timeout elapses, or when the stream has ended or failed.
    pub async fn next_fix(&mut self) -> Option<PositionFix> {
        if self.exhausted {
            return None;
        }

        match tokio::time::timeout(self.timeout, self.read_until_fix()).await {
            Ok(fix) => fix,
            Err(_) => {
                debug!("No GGA fix within {:?}", self.timeout);
                None
            }
        }
    }

    /// Timeout applied to each [`next_fix`](Self::next_fix) call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn read_until_fix(&mut self) -> Option<PositionFix> {
        loop {
            // Partial lines survive a timeout cancelling this read
            match self.lines.next_line(&mut self.reader).await {
                Ok(None) => {
                    warn!("Positioning receiver stream ended");
                    self.exhausted = true;
                    return None;
                }
                Ok(Some(raw)) => {
                    let line = String::from_utf8_lossy(&raw);

                    if let Some(fix) = parse_gga(&line) {
                        debug!(
                            "GGA fix: time={:?} quality={:?} sats={:?}",
                            fix.time, fix.quality, fix.satellites
                        );
                        return Some(fix);
                    }
                }
                Err(e) => {
                    warn!("Failed to read positioning receiver: {}", e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const SAMPLE: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_parse_sample_sentence() {
        let fix = parse_gga(SAMPLE).unwrap();

        assert_eq!(fix.time.as_deref(), Some("123519"));
        assert_eq!(fix.latitude.as_deref(), Some("4807.038"));
        assert_eq!(fix.ns.as_deref(), Some("N"));
        assert_eq!(fix.longitude.as_deref(), Some("01131.000"));
        assert_eq!(fix.ew.as_deref(), Some("E"));
        assert_eq!(fix.quality.as_deref(), Some("1"));
        assert_eq!(fix.satellites.as_deref(), Some("08"));
        assert_eq!(fix.altitude.as_deref(), Some("545.4"));
    }

    #[test]
    fn test_parse_accepts_crlf_terminator() {
        let line = format!("{}\r\n", SAMPLE);
        assert!(parse_gga(&line).is_some());
    }

    #[test]
    fn test_parse_rejects_other_sentence_types() {
        assert!(parse_gga("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A").is_none());
        assert!(parse_gga("$GPGSV,2,1,08,01,40,083,46,02,17,308,41").is_none());
        assert!(parse_gga("").is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(parse_gga("$GPGGA,123519,4807.038,N").is_none());
        assert!(parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,,").is_none());
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let corrupted = SAMPLE.replace("*47", "*48");
        assert!(parse_gga(&corrupted).is_none());

        let garbage = SAMPLE.replace("*47", "*zz");
        assert!(parse_gga(&garbage).is_none());
    }

    #[test]
    fn test_parse_rejects_identifier_prefix_only() {
        // Same leading characters, different token
        assert!(parse_gga("$GPGGAX,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,").is_none());
    }

    #[test]
    fn test_parse_without_checksum() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,").unwrap();
        assert_eq!(fix.altitude.as_deref(), Some("545.4"));
    }

    #[test]
    fn test_parse_empty_fields_become_unavailable() {
        let fix = parse_gga("$GPGGA,123519,,,,,0,00,,,M,,M,,").unwrap();

        assert_eq!(fix.time.as_deref(), Some("123519"));
        assert_eq!(fix.latitude, None);
        assert_eq!(fix.longitude, None);
        assert_eq!(fix.altitude, None);
        assert_eq!(fix.satellites.as_deref(), Some("00"));
    }

    #[tokio::test]
    async fn test_next_fix_skips_non_matching_lines() {
        let stream = format!(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n\
             garbage line\r\n\
             {}\r\n",
            SAMPLE
        );
        let mut source = PositionSource::new(BufReader::new(stream.as_bytes()), Duration::from_secs(1));

        let fix = source.next_fix().await.unwrap();
        assert_eq!(fix, parse_gga(SAMPLE).unwrap());
    }

    #[tokio::test]
    async fn test_non_matching_line_does_not_change_next_fix() {
        let plain = format!("{}\n", SAMPLE);
        let noisy = format!("$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48\n{}\n", SAMPLE);

        let mut a = PositionSource::new(BufReader::new(plain.as_bytes()), Duration::from_secs(1));
        let mut b = PositionSource::new(BufReader::new(noisy.as_bytes()), Duration::from_secs(1));

        assert_eq!(a.next_fix().await, b.next_fix().await);
    }

    #[tokio::test]
    async fn test_next_fix_returns_none_on_end_of_stream() {
        let mut source = PositionSource::new(BufReader::new(&b"$GPGSA,A,3\n"[..]), Duration::from_secs(1));

        assert_eq!(source.next_fix().await, None);
        // Stays unavailable without blocking
        assert_eq!(source.next_fix().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_fix_times_out_on_silent_receiver() {
        let (reader, _writer) = tokio::io::duplex(64);
        let mut source = PositionSource::new(BufReader::new(reader), Duration::from_millis(2000));

        let started = tokio::time::Instant::now();
        assert_eq!(source.next_fix().await, None);
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_next_fix_tolerates_invalid_utf8() {
        let mut stream = vec![0xFF, 0xFE, b'\n'];
        stream.extend_from_slice(SAMPLE.as_bytes());
        stream.push(b'\n');
        let mut source = PositionSource::new(BufReader::new(&stream[..]), Duration::from_secs(1));

        assert!(source.next_fix().await.is_some());
    }

    #[tokio::test]
    async fn test_unterminated_noise_is_bounded_and_skipped() {
        let mut stream = vec![b'U'; 4096];
        stream.push(b'\n');
        stream.extend_from_slice(SAMPLE.as_bytes());
        stream.extend_from_slice(b"\r\n");
        let mut source = PositionSource::new(BufReader::new(&stream[..]), Duration::from_secs(1));

        assert_eq!(source.next_fix().await, parse_gga(SAMPLE));
        assert_eq!(source.lines.dropped(), 1);
    }
}
