//! Propulsion thread: applies start/stop commands as they arrive.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::control::{PropulsionCommand, PropulsionController};
use crate::hardware::VehicleIo;
use crate::shared::SharedState;

/// How often an idle propulsion thread checks for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Propulsion thread state and logic.
pub struct PropulsionThread {
    controller: PropulsionController,
    commands: Receiver<PropulsionCommand>,
    shared_state: Arc<SharedState>,
}

impl PropulsionThread {
    pub fn new(
        io: Arc<dyn VehicleIo>,
        shared_state: Arc<SharedState>,
        commands: Receiver<PropulsionCommand>,
    ) -> Self {
        Self {
            controller: PropulsionController::new(io),
            commands,
            shared_state,
        }
    }

    /// Run the propulsion thread main loop.
    pub fn run(&mut self) {
        log::info!("Propulsion thread started");

        while !self.shared_state.should_shutdown() {
            match self.commands.recv_timeout(SHUTDOWN_POLL) {
                Ok(command) => self.controller.apply(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Propulsion thread: navigator gone");
                    break;
                }
            }
        }

        self.controller.apply(PropulsionCommand::Stop);
        log::info!("Propulsion thread shutting down");
    }
}
