use crate::sensors::PowerSensor;
use crate::utils::cancel::{CancellationLatch, ShutdownSignals};
use crate::utils::errors::MonitoringError;
use crate::utils::status::{StatusLine, StatusWriter};
use crate::utils::trace_log::TraceLog;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Fixed sampling period. Every sample is integrated as one full period.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// One instantaneous power reading
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub power_watts: f64,
}

impl Sample {
    pub fn from_milliwatts(timestamp: DateTime<Local>, milliwatts: u64) -> Self {
        Self {
            timestamp,
            power_watts: milliwatts as f64 / 1000.0,
        }
    }

    /// Energy of this sample in kWh, treating the reading as constant for one second
    pub fn energy_kwh(&self) -> f64 {
        self.power_watts / 3600.0 / 1000.0
    }
}

/// Running energy total of one session
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EnergyAccumulator {
    pub total_kwh: f64,
    pub samples: u64,
}

impl EnergyAccumulator {
    pub fn add(&mut self, sample: &Sample) {
        self.total_kwh += sample.energy_kwh();
        self.samples += 1;
    }
}

/// Final message of a sampling worker, sent exactly once
#[derive(Debug)]
pub(crate) struct SessionReport {
    pub total_kwh: f64,
    pub samples: u64,
    /// Fatal error that ended the session early, if any
    pub error: Option<MonitoringError>,
}

/// Background sampling loop of one monitoring session
pub(crate) struct SamplingWorker<S: PowerSensor> {
    sensor: Arc<S>,
    trace_log: Option<TraceLog>,
    status: Option<StatusLine<StatusWriter>>,
    latch: CancellationLatch,
    signals: ShutdownSignals,
}

impl<S: PowerSensor> SamplingWorker<S> {
    pub fn new(
        sensor: Arc<S>,
        trace_log: Option<TraceLog>,
        status: Option<StatusLine<StatusWriter>>,
        latch: CancellationLatch,
        signals: ShutdownSignals,
    ) -> Self {
        Self {
            sensor,
            trace_log,
            status,
            latch,
            signals,
        }
    }

    /// Sample until cancelled, then hand the total to the supervisor
    pub async fn run(self, report_tx: oneshot::Sender<SessionReport>) {
        let sensor_name = self.sensor.name();
        let report = self.sample_until_cancelled().await;
        info!(
            "Sampling worker for {} stopped after {} samples ({:.5} kWh)",
            sensor_name, report.samples, report.total_kwh
        );
        if report_tx.send(report).is_err() {
            warn!("Supervisor dropped before the final energy total was delivered");
        }
    }

    async fn sample_until_cancelled(mut self) -> SessionReport {
        let mut energy = EnergyAccumulator::default();

        // Fresh hardware handle for every session
        let init = self.sensor.init().await;
        let mut error = match init {
            Ok(mut handle) => self.sampling_loop(&mut handle, &mut energy).await.err(),
            Err(e) => {
                error!("Failed to initialise sensor {}: {}", self.sensor.name(), e);
                Some(MonitoringError::from(e))
            }
        };

        if let Some(status) = self.status.as_mut() {
            if let Err(e) = status.finish() {
                warn!("Failed to finish status line: {}", e);
            }
        }
        if let Some(trace_log) = self.trace_log.take() {
            if let Err(e) = trace_log.close() {
                error!("Failed to close power trace: {}", e);
                error = error.or(Some(e));
            }
        }

        SessionReport {
            total_kwh: energy.total_kwh,
            samples: energy.samples,
            error,
        }
    }

    async fn sampling_loop(
        &mut self,
        handle: &mut S::Handle,
        energy: &mut EnergyAccumulator,
    ) -> Result<(), MonitoringError> {
        loop {
            // A stop that arrived while the last period elapsed wins over the next sample
            if self.latch.is_cancelled() {
                debug!("Cancellation observed after {} samples", energy.samples);
                return Ok(());
            }

            if let Err(e) = self.sample_once(handle, energy).await {
                error!("Sampling failed after {} samples: {}", energy.samples, e);
                return Err(e);
            }

            // Only blocking point: a full period after this sample, a stop request or a signal
            tokio::select! {
                biased;
                _ = self.latch.cancelled() => {
                    debug!("Cancellation observed after {} samples", energy.samples);
                    return Ok(());
                }
                kind = self.signals.received() => {
                    info!("Received {}, stopping after {} samples", kind, energy.samples);
                    self.latch.cancel();
                    return Ok(());
                }
                _ = sleep(SAMPLE_PERIOD) => {}
            }
            // A stop due on the same timer tick gets to run first
            tokio::task::yield_now().await;
        }
    }

    async fn sample_once(
        &mut self,
        handle: &mut S::Handle,
        energy: &mut EnergyAccumulator,
    ) -> Result<(), MonitoringError> {
        let milliwatts = self.sensor.read_power_milliwatts(handle).await?;
        let sample = Sample::from_milliwatts(Local::now(), milliwatts);
        energy.add(&sample);
        debug!(
            "Sample {}: {:.3} W, {:.5} kWh so far",
            energy.samples, sample.power_watts, energy.total_kwh
        );

        if let Some(trace_log) = self.trace_log.as_mut() {
            trace_log.append(&sample.timestamp, sample.power_watts)?;
        }
        if let Some(status) = self.status.as_mut() {
            // Display is cosmetic, a broken terminal does not end the session
            if let Err(e) = status.update(&sample.timestamp, energy.total_kwh) {
                warn!("Failed to update status line: {}", e);
            }
        }
        Ok(())
    }
}
