use crate::sensors::PowerSensor;
use crate::utils::errors::SensorError;
use async_trait::async_trait;
use log::{debug, info};
use nvml_wrapper::Nvml;

/// NVIDIA GPU power sensor backed by NVML
pub struct NvidiaGpu {
    pub device_index: u32,
}

impl NvidiaGpu {
    pub fn new(device_index: u32) -> Self {
        Self { device_index }
    }
}

impl Default for NvidiaGpu {
    fn default() -> Self {
        Self { device_index: 0 } // Default to GPU 0
    }
}

#[async_trait]
impl PowerSensor for NvidiaGpu {
    type Handle = Nvml;

    async fn init(&self) -> Result<Nvml, SensorError> {
        let nvml = Nvml::init()?;
        let count = nvml.device_count()?;
        if self.device_index >= count {
            return Err(SensorError::UnavailableError(format!(
                "GPU {} requested but only {} device(s) found",
                self.device_index, count
            )));
        }
        let device_name = nvml
            .device_by_index(self.device_index)?
            .name()
            .unwrap_or_else(|_| "unknown".to_string());
        info!(
            "NVML initialised, monitoring GPU {} ({})",
            self.device_index, device_name
        );
        Ok(nvml)
    }

    async fn read_power_milliwatts(&self, nvml: &mut Nvml) -> Result<u64, SensorError> {
        // NVML reports milliwatts
        let milliwatts = nvml.device_by_index(self.device_index)?.power_usage()?;
        debug!("GPU {} power usage: {} mW", self.device_index, milliwatts);
        Ok(u64::from(milliwatts))
    }

    fn name(&self) -> String {
        format!("nvidia-gpu-{}", self.device_index)
    }

    fn is_available() -> bool {
        Nvml::init()
            .and_then(|nvml| nvml.device_count())
            .map(|count| count > 0)
            .unwrap_or(false)
    }
}
