//! Actuation controllers.
//!
//! - [`PropulsionController`]: open-loop start/stop of both drive motors
//! - [`PositionController`]: steering servo, countdown timer and drive-distance
//!   target serviced on one periodic tick
//!
//! Both are commanded by the navigator through channels. A command carries its
//! data, so setting a target and notifying the controller is one operation.

mod position;
mod propulsion;

pub use position::PositionController;
pub use propulsion::PropulsionController;

/// Commands for the propulsion controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropulsionCommand {
    /// Apply `velocity` (signed speed × direction) to both drive motors, coasting
    Start { velocity: i32 },
    /// Zero power with brake
    Stop,
}

/// Requests for the position/timer controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    /// Servo steering to `target`; completion raises `STEER_DONE` once
    Steer { target: i32 },
    /// Complete drive `generation` after `ticks` ticks; 0 disarms the countdown
    Countdown { ticks: u32, generation: u32 },
    /// Complete drive `generation` once the drive position moved by `distance`
    DriveDistance { distance: i32, generation: u32 },
    /// Disarm countdown and drive distance; steering is left alone
    Cancel,
}
