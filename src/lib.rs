pub mod utils {
    pub mod cancel;
    pub mod errors;
    pub mod logger;
    pub mod status;
    pub mod trace_log;
}

pub mod blocking;
pub mod config;
pub mod power_watcher;
pub mod sampling;
pub mod sensors;

pub use blocking::BlockingPowerWatcher;
pub use config::WatcherConfig;
pub use power_watcher::{EnergyTotal, PowerWatcher};
pub use sensors::{DummySensor, NvidiaGpu, PowerSensor};
pub use utils::errors::{MonitoringError, SensorError};
