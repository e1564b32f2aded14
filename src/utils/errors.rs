use nvml_wrapper::error::NvmlError;
use thiserror::Error;

/// Failures of the hardware power-reading capability
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("NVML error: {0}")]
    NvmlError(#[from] NvmlError),
    #[error("Sensor unavailable: {0}")]
    UnavailableError(String),
    #[error("Sensor read error: {0}")]
    ReadError(String),
}

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Hardware error: {0}")]
    HardwareError(#[from] SensorError),
    #[error("Usage error: {0}")]
    UsageError(String),
    #[error("Log file error: {0}")]
    LogFileError(#[from] std::io::Error),
    #[error("Worker terminated: {0}")]
    WorkerTerminated(String),
    #[error("Other error: {0}")]
    Other(String),
}
