//! Sensor thread: periodic sampling and edge detection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SensorConfig;
use crate::hardware::VehicleIo;
use crate::sampler::SensorSampler;
use crate::shared::SharedState;

/// Sensor thread state and logic.
pub struct SensorThread {
    sampler: SensorSampler,
    shared_state: Arc<SharedState>,
    period: Duration,
}

impl SensorThread {
    pub fn new(config: SensorConfig, io: Arc<dyn VehicleIo>, shared_state: Arc<SharedState>) -> Self {
        let period = Duration::from_millis(config.sample_period_ms);
        Self {
            sampler: SensorSampler::new(io, Arc::clone(&shared_state), config),
            shared_state,
            period,
        }
    }

    /// Run the sensor thread main loop.
    pub fn run(&mut self) {
        log::info!("Sensor thread started ({:?} period)", self.period);

        while !self.shared_state.should_shutdown() {
            let loop_start = Instant::now();
            self.sampler.sample();

            let elapsed = loop_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }

        log::info!("Sensor thread shutting down");
    }
}
