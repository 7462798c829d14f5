//! # Monitor Module
//!
//! Consumer side of the wired serial link.
//!
//! This module handles:
//! - Reading newline-framed records from the USB serial adapter
//! - Formatting them for display ([`display`])
//! - Publishing whole [`DisplayState`] snapshots through a `watch` channel
//! - Re-detecting the adapter when the polling task ends
//!
//! The polling task is the only writer of the display state; renderers only
//! ever observe complete snapshots.

pub mod display;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::codec::decode_record;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::serial::{detect_ports, LineReader, SerialDevice};

pub use display::{DisplayState, LinkStatus};

/// Longest record line accepted from the link; longer lines are dropped
pub const MAX_RECORD_LEN: usize = 4096;

/// Drain `reader` line by line into `state` until end of stream.
///
/// Malformed lines are logged and dropped. Returns the number of records
/// applied.
pub async fn poll_records<R>(mut reader: R, state: &watch::Sender<DisplayState>) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = LineReader::new(MAX_RECORD_LEN);
    let mut applied = 0;

    while let Some(raw) = lines.next_line(&mut reader).await? {
        let line = raw.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match decode_record(line) {
            Ok(reading) => {
                state.send_modify(|s| s.apply(&reading));
                applied += 1;
            }
            Err(e) => warn!(
                "Received malformed record ({}): {}",
                e,
                String::from_utf8_lossy(line)
            ),
        }
    }

    Ok(applied)
}

/// Keeps one polling task attached to the consumer's serial adapter
#[derive(Debug)]
pub struct Monitor {
    state: Arc<watch::Sender<DisplayState>>,
    port_prefix: String,
    baud_rate: u32,
    check_interval: Duration,
    poller: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(config: &MonitorConfig) -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        Self {
            state: Arc::new(state),
            port_prefix: config.port_prefix.clone(),
            baud_rate: config.baud_rate,
            check_interval: config.check_interval(),
            poller: None,
        }
    }

    /// Receive display snapshots
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }

    /// Whether a polling task is currently running
    pub fn is_attached(&self) -> bool {
        self.poller.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn a polling task for `reader`, replacing any previous one
    pub fn attach<R>(&mut self, device: &str, reader: R)
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        if let Some(old) = self.poller.take() {
            old.abort();
        }

        self.state
            .send_modify(|s| s.link = LinkStatus::Connected(device.to_string()));
        info!("Monitoring {}", device);

        let state = Arc::clone(&self.state);
        let device = device.to_string();
        self.poller = Some(tokio::spawn(async move {
            match poll_records(reader, &state).await {
                Ok(count) => info!("{} closed after {} records", device, count),
                Err(e) => warn!("Lost {}: {}", device, e),
            }
            state.send_modify(|s| s.link = LinkStatus::Disconnected);
        }));
    }

    /// Attach to the first matching adapter if no polling task is alive.
    ///
    /// Returns whether a polling task is running afterwards.
    pub fn check_link(&mut self) -> bool {
        if self.is_attached() {
            return true;
        }
        self.poller = None;

        let Some(path) = detect_ports(&self.port_prefix).into_iter().next() else {
            debug!("No serial adapter matching {}*", self.port_prefix);
            return false;
        };

        match SerialDevice::open(&path, self.baud_rate) {
            Ok(device) => {
                let path = device.device_path().to_string();
                self.attach(&path, BufReader::new(device.into_stream()));
                true
            }
            Err(e) => {
                warn!("Failed to attach to {}: {}", path, e);
                false
            }
        }
    }

    /// Check the link every `check_interval` until `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.check_link();
                }
            }
        }

        if let Some(task) = self.poller.take() {
            task.abort();
        }
        self.state.send_modify(|s| s.link = LinkStatus::Disconnected);
    }
}
