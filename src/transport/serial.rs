//! # Serial Transport
//!
//! One record per line over the wired serial link.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Connector, Transport};
use crate::codec::EncodedRecord;
use crate::error::{RelayError, Result};
use crate::serial::SerialPortIO;

/// Record terminator on the serial link
pub const LINE_TERMINATOR: u8 = b'\n';

/// Newline-framed serial transport
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPortIO>>,
    connector: Connector<Box<dyn SerialPortIO>>,
    write_timeout: Duration,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("connected", &self.port.is_some())
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Create the transport and make one connection attempt.
    ///
    /// A failed first attempt is not an error: the transport starts
    /// disconnected and the orchestrator retries on later cycles.
    pub fn connect(
        name: &str,
        mut connector: Connector<Box<dyn SerialPortIO>>,
        write_timeout: Duration,
    ) -> Self {
        let port = match connector() {
            Ok(port) => Some(port),
            Err(e) => {
                warn!("Serial transport '{}' starting disconnected: {}", name, e);
                None
            }
        };

        Self {
            name: name.to_string(),
            port,
            connector,
            write_timeout,
        }
    }

    /// Frame a record as a single newline-terminated line
    pub fn frame(record: &EncodedRecord) -> Vec<u8> {
        let mut frame = Vec::with_capacity(record.len() + 1);
        frame.extend_from_slice(record.as_bytes());
        frame.push(LINE_TERMINATOR);
        frame
    }

    async fn write_frame(port: &mut dyn SerialPortIO, frame: &[u8]) -> std::io::Result<()> {
        port.write_all(frame).await?;
        port.flush().await
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn send(&mut self, record: &EncodedRecord) -> Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(RelayError::TransportUnavailable(self.name.clone()));
        };

        let frame = Self::frame(record);
        let outcome = tokio::time::timeout(self.write_timeout, Self::write_frame(port.as_mut(), &frame)).await;

        let failure = match outcome {
            Ok(Ok(())) => {
                debug!("Sent record on '{}' ({} bytes)", self.name, frame.len());
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("write exceeded {:?}", self.write_timeout),
        };

        // A write error invalidates the connection
        self.port = None;
        Err(RelayError::transport(&self.name, failure))
    }

    async fn reconnect(&mut self) -> Result<()> {
        let port = (self.connector)()?;
        self.port = Some(port);
        info!("Serial transport '{}' reconnected", self.name);
        Ok(())
    }
}
