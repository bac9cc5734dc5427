//! Periodic sensor sampler with edge detection.
//!
//! Every sample records all four channels. Line presence and obstacle
//! presence are thresholded from single samples and only their transitions
//! notify the navigator:
//!
//! - Line edge (either way): snapshot the drive position, then `LINE_UPDATE`
//! - Obstacle edge to present: `OBSTACLE` (the clearing edge is silent)
//! - Touch press (when enabled): `START`
//!
//! The first sample establishes the initial states without signalling.

use std::sync::Arc;

use crate::config::SensorConfig;
use crate::hardware::VehicleIo;
use crate::shared::SharedState;
use crate::signal::SignalSet;
use crate::stats::Channel;

/// Sensor sampler state.
pub struct SensorSampler {
    io: Arc<dyn VehicleIo>,
    shared: Arc<SharedState>,
    config: SensorConfig,
    line: Option<bool>,
    obstacle: Option<bool>,
    touch: bool,
}

impl SensorSampler {
    pub fn new(io: Arc<dyn VehicleIo>, shared: Arc<SharedState>, config: SensorConfig) -> Self {
        Self {
            io,
            shared,
            config,
            line: None,
            obstacle: None,
            // Treat the button as released so a held press at boot still starts
            touch: false,
        }
    }

    /// Take one sample of every channel. Returns the signals raised.
    pub fn sample(&mut self) -> SignalSet {
        let light = self.io.read_light();
        let range = self.io.read_range();
        let steer = self.io.read_steer_position();
        let drive = self.io.read_drive_position();

        self.shared.record(Channel::Light, light);
        self.shared.record(Channel::Range, range);
        self.shared.record(Channel::SteerPosition, steer);
        self.shared.record(Channel::DrivePosition, drive);

        let mut raised = SignalSet::EMPTY;

        let on_line = light < self.config.light_threshold;
        match self.line.replace(on_line) {
            None => self.shared.set_on_line(on_line),
            Some(previous) if previous != on_line => {
                // Snapshot and flag before the signal that lets the navigator read them
                self.shared.set_line_edge_position(drive);
                self.shared.set_on_line(on_line);
                log::trace!(
                    "Sampler: line {} at drive {}",
                    if on_line { "found" } else { "lost" },
                    drive
                );
                raised |= SignalSet::LINE_UPDATE;
            }
            Some(_) => {}
        }

        let obstacle = range < self.config.range_threshold;
        let previous = self.obstacle.replace(obstacle);
        self.shared.set_obstacle(obstacle);
        if obstacle && previous == Some(false) {
            log::debug!("Sampler: obstacle at range {}", range);
            raised |= SignalSet::OBSTACLE;
        }

        if self.config.start_on_touch {
            let pressed = self.io.read_touch();
            if pressed && !self.touch {
                log::info!("Sampler: start button pressed");
                raised |= SignalSet::START;
            }
            self.touch = pressed;
        }

        if !raised.is_empty() {
            self.shared.navigator_events.raise(raised);
        }
        raised
    }

    pub fn line_state(&self) -> Option<bool> {
        self.line
    }
}
