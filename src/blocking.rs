use crate::config::WatcherConfig;
use crate::power_watcher::{EnergyTotal, PowerWatcher};
use crate::sensors::PowerSensor;
use crate::utils::errors::MonitoringError;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Synchronous front end for callers without an async runtime
///
/// Owns a small tokio runtime so the sampling worker runs on its own thread,
/// unaffected by whatever the calling thread is busy with.
pub struct BlockingPowerWatcher<S: PowerSensor> {
    // Dropped before the runtime so a running worker is aborted first
    watcher: PowerWatcher<S>,
    /// Tokio runtime hosting the sampling worker
    runtime: tokio::runtime::Runtime,
}

impl<S: PowerSensor> BlockingPowerWatcher<S> {
    pub fn new(config: WatcherConfig, sensor: S) -> Result<Self, MonitoringError> {
        let watcher = PowerWatcher::new(config, sensor)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("power-watcher")
            .enable_all()
            .build()
            .map_err(|e| {
                MonitoringError::Other(format!("Failed to create Tokio runtime: {}", e))
            })?;
        Ok(Self { watcher, runtime })
    }

    /// Check if the underlying sensor is available on the system
    pub fn is_available() -> bool {
        S::is_available()
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    pub fn total(&self) -> EnergyTotal {
        self.watcher.total()
    }

    pub fn start(&mut self) -> Result<EnergyTotal, MonitoringError> {
        self.runtime.block_on(self.watcher.start())
    }

    pub fn stop(&mut self) -> Result<f64, MonitoringError> {
        self.runtime.block_on(self.watcher.stop())
    }

    pub fn stop_timeout(&mut self, grace: Duration) -> Result<f64, MonitoringError> {
        self.runtime.block_on(self.watcher.stop_timeout(grace))
    }

    pub fn terminate(&mut self) -> Result<Option<f64>, MonitoringError> {
        self.runtime.block_on(self.watcher.terminate())
    }

    /// Run `work` on the calling thread while monitoring
    ///
    /// Returns the output of `work` next to the result of stopping the
    /// session, so a monitoring failure never discards the work. The session
    /// is stopped even if `work` panics; the panic is resumed afterwards.
    pub fn watch<F, R>(
        &mut self,
        work: F,
    ) -> Result<(R, Result<f64, MonitoringError>), MonitoringError>
    where
        F: FnOnce() -> R,
    {
        self.start()?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(work));
        let energy = self.stop();
        match outcome {
            Ok(output) => Ok((output, energy)),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
