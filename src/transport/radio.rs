//! # Radio Transport
//!
//! Chunked delivery over a fixed-size packet radio.
//!
//! The radio has no framing for payloads larger than one packet, so each
//! record is split into `chunk_size` pieces sent as separate packets:
//!
//! ```text
//! record (10 bytes), chunk_size 4:
//! [b0 b1 b2 b3] [b4 b5 b6 b7] [b8 b9]
//! ```
//!
//! The last chunk is shorter when the record length is not a multiple of the
//! chunk size; no padding is added, so the receiver reassembles by plain
//! concatenation.
//!
//! ## Delivery Guarantees
//!
//! None. After every chunk the transport listens for one inbound packet for
//! `ack_window` and appends whatever arrives to the acknowledgement log. This
//! is a diagnostic side channel only: a missing acknowledgement never causes a
//! retry, and a received one confirms nothing about ordering or integrity.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use super::{Connector, Transport};
use crate::codec::EncodedRecord;
use crate::error::{RelayError, Result};
use crate::serial::SerialPortIO;
use crate::telemetry::ack_log::AckLog;

/// Packet-oriented radio link
#[async_trait]
pub trait RadioLink: Send {
    /// Largest payload one packet can carry
    fn max_packet_size(&self) -> usize;

    /// Transmit one packet
    async fn send_packet(&mut self, packet: &[u8]) -> io::Result<()>;

    /// Wait up to `window` for one inbound packet
    async fn receive_packet(&mut self, window: Duration) -> io::Result<Option<Vec<u8>>>;
}

/// Radio modem attached over a UART in packet mode.
///
/// Each write is transmitted as one packet; each read returns the payload of
/// at most one received packet.
pub struct SerialRadio {
    port: Box<dyn SerialPortIO>,
    max_packet_size: usize,
}

impl SerialRadio {
    pub fn new(port: Box<dyn SerialPortIO>, max_packet_size: usize) -> Self {
        Self {
            port,
            max_packet_size,
        }
    }
}

#[async_trait]
impl RadioLink for SerialRadio {
    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    async fn send_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        self.port.write_all(packet).await?;
        self.port.flush().await
    }

    async fn receive_packet(&mut self, window: Duration) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.max_packet_size];
        match tokio::time::timeout(window, self.port.read(&mut buf)).await {
            Ok(Ok(0)) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "radio modem closed")),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}

/// Chunking and pacing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioSettings {
    /// Bytes per packet, independent of record length
    pub chunk_size: usize,
    /// Pause between consecutive chunks of one record
    pub inter_chunk_delay: Duration,
    /// How long to listen for an acknowledgement after each chunk
    pub ack_window: Duration,
    /// Upper bound on a single packet transmission
    pub send_timeout: Duration,
}

/// Split a record into radio-sized chunks
///
/// # Examples
///
/// ```
/// use imu_gps_relay::transport::radio::chunk_record;
///
/// let sizes: Vec<usize> = chunk_record(b"0123456789", 4).map(|c| c.len()).collect();
/// assert_eq!(sizes, vec![4, 4, 2]);
/// ```
pub fn chunk_record(record: &[u8], chunk_size: usize) -> std::slice::Chunks<'_, u8> {
    record.chunks(chunk_size.max(1))
}

/// Best-effort chunked radio transport
pub struct RadioTransport {
    name: String,
    link: Option<Box<dyn RadioLink>>,
    connector: Connector<Box<dyn RadioLink>>,
    settings: RadioSettings,
    ack_log: Option<AckLog>,
}

impl std::fmt::Debug for RadioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioTransport")
            .field("name", &self.name)
            .field("connected", &self.link.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RadioTransport {
    /// Create the transport and make one connection attempt
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when `chunk_size` is zero. A link
    /// that cannot be opened yet is not an error.
    pub fn connect(
        name: &str,
        connector: Connector<Box<dyn RadioLink>>,
        settings: RadioSettings,
        ack_log: Option<AckLog>,
    ) -> Result<Self> {
        if settings.chunk_size == 0 {
            return Err(RelayError::transport(name, "chunk_size must be greater than 0"));
        }

        let mut transport = Self {
            name: name.to_string(),
            link: None,
            connector,
            settings,
            ack_log,
        };

        if let Err(e) = transport.open_link() {
            warn!("Radio transport '{}' starting disconnected: {}", name, e);
        }
        Ok(transport)
    }

    pub fn settings(&self) -> &RadioSettings {
        &self.settings
    }

    fn open_link(&mut self) -> Result<()> {
        let link = (self.connector)()?;
        if link.max_packet_size() < self.settings.chunk_size {
            return Err(RelayError::transport(
                &self.name,
                format!(
                    "chunk_size {} exceeds radio packet size {}",
                    self.settings.chunk_size,
                    link.max_packet_size()
                ),
            ));
        }
        self.link = Some(link);
        Ok(())
    }

    /// Listen for one acknowledgement packet and log it
    async fn collect_ack(&mut self, chunk_index: usize) {
        let Some(link) = self.link.as_mut() else {
            return;
        };

        match link.receive_packet(self.settings.ack_window).await {
            Ok(Some(packet)) => {
                debug!(
                    "Radio '{}' ack after chunk {} ({} bytes)",
                    self.name,
                    chunk_index,
                    packet.len()
                );
                if let Some(log) = self.ack_log.as_mut() {
                    if let Err(e) = log.record(&self.name, chunk_index, &packet) {
                        warn!("Failed to write ack log: {}", e);
                    }
                }
            }
            Ok(None) => trace!("No ack after chunk {}", chunk_index),
            Err(e) => debug!("Radio '{}' ack receive failed: {}", self.name, e),
        }
    }
}

#[async_trait]
impl Transport for RadioTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    async fn send(&mut self, record: &EncodedRecord) -> Result<()> {
        if self.link.is_none() {
            return Err(RelayError::TransportUnavailable(self.name.clone()));
        }

        let chunks: Vec<&[u8]> = chunk_record(record.as_bytes(), self.settings.chunk_size).collect();
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let Some(link) = self.link.as_mut() else {
                return Err(RelayError::TransportUnavailable(self.name.clone()));
            };

            let failure = match tokio::time::timeout(self.settings.send_timeout, link.send_packet(chunk)).await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!("packet send exceeded {:?}", self.settings.send_timeout)),
            };
            if let Some(reason) = failure {
                self.link = None;
                return Err(RelayError::transport(
                    &self.name,
                    format!("chunk {}/{}: {}", index + 1, total, reason),
                ));
            }
            trace!("Radio '{}' sent chunk {}/{} ({} bytes)", self.name, index + 1, total, chunk.len());

            if !self.settings.ack_window.is_zero() {
                self.collect_ack(index).await;
            }

            if index + 1 < total && !self.settings.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_chunk_delay).await;
            }
        }

        debug!("Sent record on '{}' in {} chunks ({} bytes)", self.name, total, record.len());
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.open_link()?;
        info!("Radio transport '{}' reconnected", self.name);
        Ok(())
    }
}
