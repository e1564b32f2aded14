use log::{error, info, warn};
use power_watcher::utils::logger::setup_logger;
use power_watcher::{
    DummySensor, MonitoringError, NvidiaGpu, PowerSensor, PowerWatcher, WatcherConfig,
};
use std::time::Duration;

const DEFAULT_DURATION_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    setup_logger();
    info!("Application started");

    let seconds = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => DEFAULT_DURATION_SECS,
        Some(Ok(seconds)) => seconds,
        Some(Err(e)) => {
            error!("Invalid duration in seconds: {}", e);
            std::process::exit(2);
        }
    };

    let mut config = WatcherConfig::from_env();
    if config.validate().is_err() {
        info!("No trace log configured, showing consumption in the terminal");
        config = config.with_display(true);
    }

    let result = if NvidiaGpu::is_available() {
        monitor(NvidiaGpu::default(), config, seconds).await
    } else {
        warn!("No NVIDIA GPU found, falling back to the dummy sensor");
        monitor(DummySensor::default(), config, seconds).await
    };

    match result {
        Ok(total) => info!("Consumed {:.5} kWh", total),
        Err(e) => {
            error!("Monitoring failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Monitor for `seconds`, or until Ctrl-C / SIGTERM stops the worker
async fn monitor<S: PowerSensor>(
    sensor: S,
    config: WatcherConfig,
    seconds: u64,
) -> Result<f64, MonitoringError> {
    let mut watcher = PowerWatcher::new(config, sensor)?;
    watcher.start().await?;
    info!("Monitoring for {} seconds...", seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => watcher.stop().await,
        result = watcher.join() => result,
    }
}
