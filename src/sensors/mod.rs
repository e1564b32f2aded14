pub mod dummy;
pub mod nvidia_gpu;

pub use dummy::DummySensor;
pub use nvidia_gpu::NvidiaGpu;

use crate::utils::errors::SensorError;
use async_trait::async_trait;

/// Hardware power-reading capability
///
/// `init` is called once at the start of every monitoring session and the
/// returned handle is owned by the sampling worker until the session ends.
#[async_trait]
pub trait PowerSensor: Send + Sync + 'static {
    /// Per-session hardware handle
    type Handle: Send + 'static;

    /// Initialise the hardware and acquire a handle to the monitored device
    async fn init(&self) -> Result<Self::Handle, SensorError>;

    /// Instantaneous power draw in milliwatts
    async fn read_power_milliwatts(&self, handle: &mut Self::Handle) -> Result<u64, SensorError>;

    /// Human readable device label used in log output
    fn name(&self) -> String;

    /// Check if this sensor type is available on the system
    fn is_available() -> bool
    where
        Self: Sized;
}
