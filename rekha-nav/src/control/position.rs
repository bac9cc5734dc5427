//! Position/timer controller.
//!
//! One periodic tick services three independent sub-modes:
//!
//! | Sub-mode | Armed by | Completion |
//! |----------|----------|------------|
//! | Steering servo | `Steer` | `STEER_DONE`, once per arm |
//! | Countdown | `Countdown` | `DRIVE_DONE` when it reaches zero |
//! | Drive distance | `DriveDistance` | `DRIVE_DONE` when the position passes the target |
//!
//! Drive completions carry the generation they were armed with, so a
//! completion raised while a `Cancel` is still in flight can be told apart
//! from one for the next drive.
//!
//! The servo is bang-bang with deceleration zones: the motor power is picked
//! from the configured speed bands by error magnitude, and the motor is
//! stopped once the error is within the dead band.

use std::sync::Arc;

use super::ControlRequest;
use crate::config::SteeringConfig;
use crate::hardware::VehicleIo;
use crate::shared::SharedState;
use crate::signal::SignalSet;
use crate::vector::{Direction, Vector};

/// Armed countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Countdown {
    remaining: u32,
    generation: u32,
}

/// Armed drive-distance target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DistanceTarget {
    direction: Direction,
    position: i32,
    generation: u32,
}

impl DistanceTarget {
    fn reached(&self, position: i32) -> bool {
        match self.direction {
            Direction::Positive => position >= self.position,
            Direction::Negative => position <= self.position,
        }
    }
}

/// Steering servo plus drive timers.
pub struct PositionController {
    io: Arc<dyn VehicleIo>,
    shared: Arc<SharedState>,
    config: SteeringConfig,
    /// Servo target while a completion signal is still owed
    steer_target: Option<i32>,
    countdown: Option<Countdown>,
    distance: Option<DistanceTarget>,
}

impl PositionController {
    pub fn new(io: Arc<dyn VehicleIo>, shared: Arc<SharedState>, config: SteeringConfig) -> Self {
        Self {
            io,
            shared,
            config,
            steer_target: None,
            countdown: None,
            distance: None,
        }
    }

    /// Arm or disarm a sub-mode.
    pub fn handle(&mut self, request: ControlRequest) {
        log::debug!("PositionController: {:?}", request);
        match request {
            ControlRequest::Steer { target } => {
                self.steer_target = Some(target);
            }
            ControlRequest::Countdown { ticks, generation } => {
                self.countdown = (ticks > 0).then_some(Countdown {
                    remaining: ticks,
                    generation,
                });
            }
            ControlRequest::DriveDistance {
                distance,
                generation,
            } => {
                let start = self.io.read_drive_position();
                self.distance = Some(DistanceTarget {
                    direction: Direction::of(distance),
                    position: start.saturating_add(distance),
                    generation,
                });
            }
            ControlRequest::Cancel => {
                self.countdown = None;
                self.distance = None;
            }
        }
    }

    /// Service every armed sub-mode once.
    pub fn tick(&mut self) {
        self.service_steering();
        self.service_countdown();
        self.service_distance();
    }

    /// Disarm everything and stop the steering motor.
    pub fn halt(&mut self) {
        self.steer_target = None;
        self.countdown = None;
        self.distance = None;
        self.io.set_steer_power(0);
    }

    pub fn steering_armed(&self) -> bool {
        self.steer_target.is_some()
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining)
    }

    fn service_steering(&mut self) {
        let Some(target) = self.steer_target else {
            return;
        };

        let current = self.io.read_steer_position();
        let delta = Vector::from(target.saturating_sub(current));

        if delta.magnitude <= self.config.dead_band {
            self.io.set_steer_power(0);
            self.steer_target = None;
            log::debug!(
                "PositionController: steering at {} (target {})",
                current,
                target
            );
            self.shared.navigator_events.raise(SignalSet::STEER_DONE);
        } else {
            let speed = self.config.servo_speed(delta.magnitude);
            self.io.set_steer_power(delta.direction * speed);
        }
    }

    fn service_countdown(&mut self) {
        let Some(countdown) = self.countdown else {
            return;
        };

        let remaining = countdown.remaining.saturating_sub(1);
        if remaining == 0 {
            self.countdown = None;
            self.shared.finish_drive(countdown.generation);
        } else {
            self.countdown = Some(Countdown {
                remaining,
                ..countdown
            });
        }
    }

    fn service_distance(&mut self) {
        let Some(target) = self.distance else {
            return;
        };

        if target.reached(self.io.read_drive_position()) {
            self.distance = None;
            self.shared.finish_drive(target.generation);
        }
    }
}
