//! Control thread: position/timer controller tick.
//!
//! Each tick first applies every pending request, then services the servo,
//! countdown and drive distance once.

use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SteeringConfig;
use crate::control::{ControlRequest, PositionController};
use crate::hardware::VehicleIo;
use crate::shared::SharedState;

/// Control thread state and logic.
pub struct ControlThread {
    controller: PositionController,
    requests: Receiver<ControlRequest>,
    shared_state: Arc<SharedState>,
    period: Duration,
}

impl ControlThread {
    pub fn new(
        config: SteeringConfig,
        io: Arc<dyn VehicleIo>,
        shared_state: Arc<SharedState>,
        requests: Receiver<ControlRequest>,
    ) -> Self {
        let period = Duration::from_millis(config.tick_period_ms);
        Self {
            controller: PositionController::new(io, Arc::clone(&shared_state), config),
            requests,
            shared_state,
            period,
        }
    }

    /// Run the control thread main loop.
    pub fn run(&mut self) {
        log::info!("Control thread started ({:?} tick)", self.period);

        'ticks: while !self.shared_state.should_shutdown() {
            let loop_start = Instant::now();

            loop {
                match self.requests.try_recv() {
                    Ok(request) => self.controller.handle(request),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        log::info!("Control thread: navigator gone");
                        break 'ticks;
                    }
                }
            }
            self.controller.tick();

            let elapsed = loop_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }

        self.controller.halt();
        log::info!("Control thread shutting down");
    }
}
