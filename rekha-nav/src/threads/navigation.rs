//! Navigation thread: runs the course once.

use std::sync::Arc;

use crate::config::VehicleConfig;
use crate::error::Result;
use crate::navigator::{Navigator, RunOutcome, SignalLink};
use crate::shared::SharedState;

/// Navigation thread state and logic.
pub struct NavigationThread {
    navigator: Navigator<SignalLink>,
}

impl NavigationThread {
    pub fn new(config: VehicleConfig, shared_state: Arc<SharedState>, link: SignalLink) -> Self {
        Self {
            navigator: Navigator::new(link, config, shared_state),
        }
    }

    /// Run the navigator. The link's command channels close on return, which
    /// stops the controller threads.
    pub fn run(mut self) -> Result<RunOutcome> {
        log::info!("Navigation thread started");
        let outcome = self.navigator.run();
        match &outcome {
            Ok(outcome) => log::info!("Navigation finished: {:?}", outcome),
            Err(e) => log::error!("Navigation thread error: {}", e),
        }
        outcome
    }
}
