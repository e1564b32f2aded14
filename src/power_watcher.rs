use crate::config::WatcherConfig;
use crate::sampling::{SAMPLE_PERIOD, SamplingWorker, SessionReport};
use crate::sensors::PowerSensor;
use crate::utils::cancel::{CancellationLatch, ShutdownSignals};
use crate::utils::errors::MonitoringError;
use crate::utils::status::{StatusLine, StatusWriter};
use crate::utils::trace_log::TraceLog;
use log::{debug, error, info, warn};
use std::future::Future;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Caller-side handle to the energy total of one session
///
/// Reads 0 kWh until the session has been stopped, then holds the final
/// total. Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct EnergyTotal {
    cell: Arc<OnceLock<f64>>,
}

impl EnergyTotal {
    /// Total in kilowatt-hours
    pub fn kwh(&self) -> f64 {
        self.cell.get().copied().unwrap_or(0.0)
    }

    /// Whether the session has delivered its final total
    pub fn is_final(&self) -> bool {
        self.cell.get().is_some()
    }

    fn finalize(&self, total_kwh: f64) {
        if self.cell.set(total_kwh).is_err() {
            warn!("Energy total already finalised, ignoring {:.5} kWh", total_kwh);
        }
    }
}

/// One start/stop cycle
struct MonitoringSession {
    latch: CancellationLatch,
    report_rx: oneshot::Receiver<SessionReport>,
    task_handle: JoinHandle<()>,
    total: EnergyTotal,
}

/// Energy monitor for a single power sensor
/// # Type Parameters
/// * `S` - A sensor type that implements `PowerSensor`
///
/// ```ignore
/// let mut watcher = PowerWatcher::new(WatcherConfig::new(None, true), NvidiaGpu::default())?;
/// let (model, energy) = watcher.watch(train(model)).await?;
/// println!("{:.5} kWh", energy?);
/// ```
pub struct PowerWatcher<S: PowerSensor> {
    config: WatcherConfig,
    /// Shared with the sampling worker of the running session
    sensor: Arc<S>,
    /// Opens the status line writer of each session
    status_writer: Box<dyn Fn() -> StatusWriter + Send + Sync>,
    session: Option<MonitoringSession>,
    /// Handle returned by the most recent start()
    total: EnergyTotal,
}

impl<S: PowerSensor> PowerWatcher<S> {
    /// Create a watcher. Fails if the configuration has no output at all.
    pub fn new(config: WatcherConfig, sensor: S) -> Result<Self, MonitoringError> {
        config.validate()?;
        Ok(Self {
            config,
            sensor: Arc::new(sensor),
            status_writer: Box::new(|| Box::new(io::stdout())),
            session: None,
            total: EnergyTotal::default(),
        })
    }

    /// Draw the status line on writers from `open` instead of stdout
    ///
    /// `open` is called once per session that has the display enabled.
    pub fn with_status_writer<W, F>(mut self, open: F) -> Self
    where
        W: Write + Send + 'static,
        F: Fn() -> W + Send + Sync + 'static,
    {
        self.status_writer = Box::new(move || Box::new(open()));
        self
    }

    /// Check if the underlying sensor is available on the system
    pub fn is_available() -> bool {
        S::is_available()
    }

    /// A session has been started and not yet stopped, joined or terminated
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Energy handle of the most recent session
    pub fn total(&self) -> EnergyTotal {
        self.total.clone()
    }

    /// Spawn the sampling worker and return immediately
    ///
    /// The returned handle reads 0 kWh until the session is stopped.
    pub async fn start(&mut self) -> Result<EnergyTotal, MonitoringError> {
        if self.session.is_some() {
            return Err(MonitoringError::UsageError(
                "monitoring session already running, stop it before starting another".to_string(),
            ));
        }
        self.config.validate()?;

        let trace_log = self
            .config
            .logfile
            .as_deref()
            .map(TraceLog::create)
            .transpose()?;
        let status = self
            .config
            .display
            .then(|| StatusLine::new((self.status_writer)()));
        // Listeners are registered before the worker exists so no signal slips past it
        let signals = if self.config.handle_signals {
            ShutdownSignals::install().map_err(signal_setup_error)?
        } else {
            ShutdownSignals::disabled()
        };

        let latch = CancellationLatch::new();
        let (report_tx, report_rx) = oneshot::channel();
        let worker = SamplingWorker::new(
            Arc::clone(&self.sensor),
            trace_log,
            status,
            latch.clone(),
            signals,
        );
        let task_handle = tokio::spawn(worker.run(report_tx));

        let total = EnergyTotal::default();
        self.total = total.clone();
        self.session = Some(MonitoringSession {
            latch,
            report_rx,
            task_handle,
            total: total.clone(),
        });

        info!(
            "Monitoring {} started, sampling every {:?}",
            self.sensor.name(),
            SAMPLE_PERIOD
        );
        Ok(total)
    }

    /// Ask the worker to stop and wait for its final total
    ///
    /// There is no timeout: a sensor read that never returns blocks here.
    /// Use [`PowerWatcher::stop_timeout`] to bound the wait.
    pub async fn stop(&mut self) -> Result<f64, MonitoringError> {
        self.finish(true, None).await
    }

    /// Like [`PowerWatcher::stop`], but hard-terminates the worker if it has not
    /// reported within `grace`. The energy total is forfeited in that case.
    pub async fn stop_timeout(&mut self, grace: Duration) -> Result<f64, MonitoringError> {
        self.finish(true, Some(grace)).await
    }

    /// Wait for a worker that ends on its own (shutdown signal or fatal error)
    ///
    /// Cancel safe: dropping the future leaves the session running.
    pub async fn join(&mut self) -> Result<f64, MonitoringError> {
        self.finish(false, None).await
    }

    /// Abort the worker immediately
    ///
    /// Returns the total only if the worker had already reported it.
    pub async fn terminate(&mut self) -> Result<Option<f64>, MonitoringError> {
        let mut session = self.session.take().ok_or_else(no_session)?;
        session.latch.cancel();
        session.task_handle.abort();
        if let Err(e) = (&mut session.task_handle).await {
            debug!("Sampling worker terminated: {}", e);
        }

        match session.report_rx.try_recv() {
            Ok(report) => {
                session.total.finalize(report.total_kwh);
                if let Some(e) = report.error {
                    warn!("Terminated worker had already failed: {}", e);
                }
                Ok(Some(report.total_kwh))
            }
            Err(_) => {
                warn!("Sampling worker terminated before reporting, energy total forfeited");
                Ok(None)
            }
        }
    }

    /// Run `work` while monitoring and return its output with the energy used
    ///
    /// Only a failed start is an outer error, `work` has not run then. Once
    /// `work` completes its output is always returned, next to the result of
    /// stopping the session. If `work` panics or the returned future is
    /// dropped early, the session is terminated and its total forfeited.
    pub async fn watch<F>(
        &mut self,
        work: F,
    ) -> Result<(F::Output, Result<f64, MonitoringError>), MonitoringError>
    where
        F: Future,
    {
        self.start().await?;
        let mut scope = WatchScope(self);
        let output = work.await;
        let energy = scope.0.stop().await;
        Ok((output, energy))
    }

    async fn finish(
        &mut self,
        cancel: bool,
        grace: Option<Duration>,
    ) -> Result<f64, MonitoringError> {
        let received = {
            let session = self.session.as_mut().ok_or_else(no_session)?;
            if cancel && session.latch.cancel() {
                debug!("Requested sampling worker shutdown");
            }
            match grace {
                None => Some((&mut session.report_rx).await),
                Some(grace) => tokio::time::timeout(grace, &mut session.report_rx).await.ok(),
            }
        };
        let session = self.session.take().ok_or_else(no_session)?;

        let report = match received {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                let reason = match session.task_handle.await {
                    Err(e) if e.is_panic() => "sampling worker panicked".to_string(),
                    Err(e) => e.to_string(),
                    Ok(()) => "sampling worker exited without reporting".to_string(),
                };
                error!("Lost energy total: {}", reason);
                return Err(MonitoringError::WorkerTerminated(reason));
            }
            None => {
                warn!(
                    "Sampling worker did not stop within {:?}, terminating it",
                    grace.unwrap_or_default()
                );
                session.task_handle.abort();
                if let Err(e) = session.task_handle.await {
                    debug!("Sampling worker terminated: {}", e);
                }
                return Err(MonitoringError::WorkerTerminated(format!(
                    "no report within {:?}, energy total forfeited",
                    grace.unwrap_or_default()
                )));
            }
        };

        // The report is the worker's last action, reap the task
        if let Err(e) = session.task_handle.await {
            warn!("Sampling worker ended abnormally after reporting: {}", e);
        }
        session.total.finalize(report.total_kwh);
        info!(
            "Monitoring stopped after {} samples: {:.5} kWh",
            report.samples, report.total_kwh
        );

        match report.error {
            Some(e) => Err(e),
            None => Ok(report.total_kwh),
        }
    }

    /// Trip the latch and abort the worker without waiting for it
    fn abandon(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            warn!("{}, terminating the sampling worker", reason);
            session.latch.cancel();
            session.task_handle.abort();
        }
    }
}

impl<S: PowerSensor> Drop for PowerWatcher<S> {
    fn drop(&mut self) {
        self.abandon("PowerWatcher dropped while monitoring");
    }
}

/// Session scope of one `watch` call
///
/// Does nothing once the session has been stopped.
struct WatchScope<'a, S: PowerSensor>(&'a mut PowerWatcher<S>);

impl<S: PowerSensor> Drop for WatchScope<'_, S> {
    fn drop(&mut self) {
        self.0.abandon("Watched work did not complete");
    }
}

fn signal_setup_error(e: io::Error) -> MonitoringError {
    MonitoringError::Other(format!("Failed to install signal handlers: {}", e))
}

fn no_session() -> MonitoringError {
    MonitoringError::UsageError(
        "no monitoring session running (stop without start, or stopped twice)".to_string(),
    )
}
