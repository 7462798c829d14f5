//! # Inertial Source
//!
//! Time-bounded sampling of the motion sensor.

use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// One complete inertial sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialSample {
    /// Angular rate X/Y/Z in rad/s
    pub angular_rate: [f64; 3],
    /// Acceleration X/Y/Z in m/s²
    pub acceleration: [f64; 3],
    /// Magnetic field X/Y/Z in µT
    pub magnetic_field: [f64; 3],
}

/// Blocking motion sensor driver
///
/// Implementations talk to the hardware bus directly. A read either yields
/// all three vectors or fails as a whole.
pub trait InertialSensor: Send + 'static {
    fn read(&mut self) -> Result<InertialSample>;
}

/// Wraps an [`InertialSensor`] with a per-sample time budget.
///
/// The driver runs on the blocking thread pool. If a read overruns the budget
/// the cycle proceeds without inertial data. At most one read is in flight:
/// while a stalled read still holds the driver, later samples fail at once
/// instead of queueing behind it.
pub struct InertialSource<S> {
    sensor: Arc<Mutex<S>>,
    timeout: Duration,
}

impl<S> std::fmt::Debug for InertialSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InertialSource")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S: InertialSensor> InertialSource<S> {
    pub fn new(sensor: S, timeout: Duration) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            timeout,
        }
    }

    /// Take one sample, or `None` if the sensor failed or overran its budget
    pub async fn sample(&self) -> Option<InertialSample> {
        match self.try_sample().await {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    async fn try_sample(&self) -> Result<InertialSample> {
        let sensor = Arc::clone(&self.sensor);
        let read = tokio::task::spawn_blocking(move || {
            let mut guard = match sensor.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    return Err(RelayError::SensorUnavailable(
                        "previous read still in progress".to_string(),
                    ))
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(RelayError::Imu("sensor lock poisoned".to_string()))
                }
            };
            guard.read()
        });

        match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(result)) => {
                let sample = result.map_err(|e| {
                    RelayError::SensorUnavailable(format!("inertial read failed: {}", e))
                })?;
                debug!("Inertial sample: {:?}", sample);
                Ok(sample)
            }
            Ok(Err(join_err)) => Err(RelayError::SensorUnavailable(format!(
                "inertial read task failed: {}",
                join_err
            ))),
            Err(_) => Err(RelayError::SensorUnavailable(format!(
                "inertial read exceeded {:?}",
                self.timeout
            ))),
        }
    }
}
