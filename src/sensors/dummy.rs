use crate::sensors::PowerSensor;
use crate::utils::errors::SensorError;
use async_trait::async_trait;
use log::info;
use rand::Rng;

/// Synthetic sensor: a base draw plus uniform jitter, always available
pub struct DummySensor {
    pub base_milliwatts: u64,
    pub jitter_milliwatts: u64,
}

impl DummySensor {
    pub fn new(base_milliwatts: u64, jitter_milliwatts: u64) -> Self {
        Self {
            base_milliwatts,
            jitter_milliwatts,
        }
    }

    /// Sensor that always reports `milliwatts`
    pub fn constant(milliwatts: u64) -> Self {
        Self::new(milliwatts, 0)
    }
}

impl Default for DummySensor {
    fn default() -> Self {
        // Roughly a mid-range GPU under load
        Self::new(250_000, 50_000)
    }
}

#[async_trait]
impl PowerSensor for DummySensor {
    type Handle = ();

    async fn init(&self) -> Result<(), SensorError> {
        info!("Dummy sensor init called");
        Ok(())
    }

    async fn read_power_milliwatts(&self, _handle: &mut ()) -> Result<u64, SensorError> {
        if self.jitter_milliwatts == 0 {
            return Ok(self.base_milliwatts);
        }
        let jitter = rand::thread_rng().gen_range(0..=self.jitter_milliwatts);
        Ok(self.base_milliwatts + jitter)
    }

    fn name(&self) -> String {
        "dummy".to_string()
    }

    fn is_available() -> bool {
        true // Dummy is always available
    }
}
