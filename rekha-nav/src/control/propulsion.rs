//! Open-loop propulsion.

use std::sync::Arc;

use super::PropulsionCommand;
use crate::hardware::{DriveMotor, VehicleIo};

/// Applies the commanded velocity to both drive motors.
pub struct PropulsionController {
    io: Arc<dyn VehicleIo>,
}

impl PropulsionController {
    pub fn new(io: Arc<dyn VehicleIo>) -> Self {
        Self { io }
    }

    pub fn apply(&self, command: PropulsionCommand) {
        let (power, brake) = match command {
            PropulsionCommand::Start { velocity } => (velocity, false),
            PropulsionCommand::Stop => (0, true),
        };
        log::trace!("Propulsion: power={} brake={}", power, brake);
        self.io.set_drive_power(DriveMotor::Left, power, brake);
        self.io.set_drive_power(DriveMotor::Right, power, brake);
    }
}
