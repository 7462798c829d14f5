//! # Transport Module
//!
//! Delivery of encoded records to the peer.
//!
//! This module handles:
//! - The [`Transport`] trait the orchestrator fans out over
//! - Newline-framed records on the wired serial link ([`serial::SerialTransport`])
//! - Fixed-size chunking over the packet radio ([`radio::RadioTransport`])
//! - Reconnecting a transport whose link was invalidated

pub mod radio;
pub mod serial;

use async_trait::async_trait;

use crate::codec::EncodedRecord;
use crate::error::Result;

pub use radio::{RadioLink, RadioSettings, RadioTransport, SerialRadio};
pub use serial::SerialTransport;

/// Re-opens a transport's link
pub type Connector<T> = Box<dyn FnMut() -> Result<T> + Send>;

/// A sink for encoded records.
///
/// A transport owns its link exclusively. A failed send leaves the transport
/// disconnected until [`reconnect`](Transport::reconnect) succeeds.
#[async_trait]
pub trait Transport: Send {
    /// Name used in logs and cycle reports
    fn name(&self) -> &str;

    /// Whether the transport currently holds a usable link
    fn is_connected(&self) -> bool;

    /// Send one record; never mutates it
    async fn send(&mut self, record: &EncodedRecord) -> Result<()>;

    /// Try to re-open the link
    async fn reconnect(&mut self) -> Result<()>;
}
