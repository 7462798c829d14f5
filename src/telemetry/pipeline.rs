//! # Telemetry Loop
//!
//! Orchestrates acquisition, encoding and fan-out, one record per cycle.
//!
//! ## Cycle
//!
//! ```text
//!        tick            always
//!  ───────────▶ Acquire ────────▶ Dispatch ──┐
//!                  ▲                         │
//!                  └──────── next tick ──────┘
//! ```
//!
//! - **Acquire**: sample the inertial sensor and wait for a position fix
//!   (both bounded), then build the record. Missing sources never block.
//! - **Dispatch**: encode, send to every transport, append to the archive.
//!   Each sink is isolated: one failing never skips another.
//!
//! Shutdown is only observed between cycles, so a dispatch in progress always
//! completes its current frame.

use std::future::Future;

use tokio::io::AsyncBufRead;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveSink;
use crate::codec::encode_record;
use crate::record::{RecordBuilder, SensorReading};
use crate::scheduler::Ticker;
use crate::sensors::{InertialSensor, InertialSource, PositionSource};
use crate::transport::Transport;

/// What happened to one transport during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The record was sent
    Delivered,
    /// The send was attempted and failed; the transport is now disconnected
    Failed,
    /// The transport was disconnected and could not be re-opened
    Skipped,
}

/// Result of one acquisition/dispatch cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u64,
    pub reading: SensorReading,
    /// Per-transport outcome, in transport registration order
    pub deliveries: Vec<(String, DeliveryOutcome)>,
    /// `None` when no archive is configured
    pub archived: Option<bool>,
}

impl CycleReport {
    pub fn outcome(&self, transport: &str) -> Option<DeliveryOutcome> {
        self.deliveries
            .iter()
            .find(|(name, _)| name == transport)
            .map(|(_, outcome)| *outcome)
    }

    pub fn delivered_count(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
            .count()
    }
}

/// The sender's acquisition/dispatch loop
pub struct TelemetryLoop<S, R> {
    inertial: InertialSource<S>,
    position: PositionSource<R>,
    builder: RecordBuilder,
    transports: Vec<Box<dyn Transport>>,
    archive: Option<Box<dyn ArchiveSink>>,
    status_interval_cycles: u64,
    cycles: u64,
    delivered: u64,
}

impl<S, R> std::fmt::Debug for TelemetryLoop<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLoop")
            .field("transports", &self.transports.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("archive", &self.archive.is_some())
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<S, R> TelemetryLoop<S, R>
where
    S: InertialSensor,
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(inertial: InertialSource<S>, position: PositionSource<R>) -> Self {
        Self {
            inertial,
            position,
            builder: RecordBuilder::new(),
            transports: Vec::new(),
            archive: None,
            status_interval_cycles: 0,
            cycles: 0,
            delivered: 0,
        }
    }

    /// Register a transport; every cycle's record is offered to each one
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn with_archive(mut self, archive: Box<dyn ArchiveSink>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Log a status line every `cycles` cycles (0 disables)
    pub fn with_status_interval(mut self, cycles: u64) -> Self {
        self.status_interval_cycles = cycles;
        self
    }

    /// Cycles completed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until `shutdown` resolves, one cycle per tick.
    ///
    /// Returns the number of cycles completed.
    pub async fn run<T, F>(&mut self, ticker: &mut T, shutdown: F) -> u64
    where
        T: Ticker + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let started = self.cycles;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested after {} cycles", self.cycles - started);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let report = self.run_cycle().await;

            if self.status_interval_cycles > 0 && report.cycle % self.status_interval_cycles == 0 {
                info!(
                    "Completed {} cycles ({} deliveries, last cycle {}/{} transports)",
                    report.cycle,
                    self.delivered,
                    report.delivered_count(),
                    report.deliveries.len()
                );
            }
        }

        self.cycles - started
    }

    /// Perform one Acquire then Dispatch
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let reading = self.acquire().await;
        self.dispatch(reading).await
    }

    async fn acquire(&mut self) -> SensorReading {
        let (inertial, fix) = tokio::join!(self.inertial.sample(), self.position.next_fix());

        if inertial.is_none() {
            debug!("Cycle {}: inertial data unavailable", self.cycles);
        }
        if fix.is_none() {
            debug!("Cycle {}: position fix unavailable", self.cycles);
        }

        self.builder.build(inertial.as_ref(), fix.as_ref())
    }

    async fn dispatch(&mut self, reading: SensorReading) -> CycleReport {
        let mut deliveries = Vec::with_capacity(self.transports.len());

        match encode_record(&reading) {
            Ok(record) => {
                for transport in self.transports.iter_mut() {
                    let name = transport.name().to_string();

                    if !transport.is_connected() {
                        match transport.reconnect().await {
                            Ok(()) => info!("Transport '{}' re-enabled", name),
                            Err(e) => {
                                debug!("Transport '{}' still unavailable: {}", name, e);
                                deliveries.push((name, DeliveryOutcome::Skipped));
                                continue;
                            }
                        }
                    }

                    let outcome = match transport.send(&record).await {
                        Ok(()) => DeliveryOutcome::Delivered,
                        Err(e) => {
                            warn!("Cycle {}: {}", self.cycles, e);
                            DeliveryOutcome::Failed
                        }
                    };
                    deliveries.push((name, outcome));
                }
            }
            Err(e) => {
                error!("Cycle {}: failed to encode record: {}", self.cycles, e);
                for transport in &self.transports {
                    deliveries.push((transport.name().to_string(), DeliveryOutcome::Skipped));
                }
            }
        }

        let archived = match self.archive.as_mut() {
            Some(archive) => match archive.append(&reading).await {
                Ok(()) => Some(true),
                Err(e) => {
                    warn!("Cycle {}: {}", self.cycles, e);
                    Some(false)
                }
            },
            None => None,
        };

        self.delivered += deliveries
            .iter()
            .filter(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
            .count() as u64;

        CycleReport {
            cycle: self.cycles,
            reading,
            deliveries,
            archived,
        }
    }
}
