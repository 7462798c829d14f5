//! # Scheduler
//!
//! Periodic tick sources for the acquisition loop.
//!
//! The loop waits on a [`Ticker`] between cycles instead of sleeping, so the
//! deployed binary runs on a wall-clock interval while tests step cycles by
//! hand with a [`ChannelTicker`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// A cancellable periodic tick.
///
/// `tick` must be cancel-safe: the loop drops a pending tick on shutdown.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Fixed-period ticker backed by [`tokio::time::Interval`]
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// First tick completes immediately, then every `period`.
    ///
    /// A cycle that overruns its period delays the schedule instead of
    /// bursting to catch up.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticker driven by explicit messages; pends forever once all senders drop
#[derive(Debug)]
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

impl ChannelTicker {
    /// Create a ticker and the handle that fires it
    pub fn new(capacity: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl Ticker for ChannelTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
