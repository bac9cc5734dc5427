//! Navigator: staged line following over a known course.
//!
//! The navigator is the only blocking loop. It composes the primitive
//! motion operations of [`Actuation`] into searches ([`search`]), stage loops
//! ([`course`]) and the obstacle choreography ([`maneuver`]).
//!
//! ```text
//! StraightTrack ─► CurveTrack ─► DashedTrack ─► SharpTurn ─► ObstacleManeuver
//!                                                                  │
//!                                                Idle ◄─ Resume ◄──┘
//! ```
//!
//! A stage whose every recovery strategy fails ends the run: the vehicle is
//! stopped, the debug marker is zeroed and [`RunOutcome::LineLost`] is
//! returned. There is no automatic restart.

mod course;
#[cfg(test)]
mod fake;
mod link;
mod maneuver;
mod search;

pub use course::Stage;
pub use link::{Actuation, SignalLink};
pub use search::{Bias, CURVE_CHAIN, Strategy};

use std::sync::Arc;

use course::Transition;

use crate::config::VehicleConfig;
use crate::error::{Error, Result};
use crate::shared::SharedState;
use crate::vector::Direction;

/// How a navigator run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every recovery strategy of `stage` failed; the vehicle was stopped
    LineLost { stage: Stage },
    /// Shutdown was requested while in `stage`
    Stopped { stage: Stage },
}

/// Course state machine over an [`Actuation`] implementation.
pub struct Navigator<A: Actuation> {
    act: A,
    config: VehicleConfig,
    shared: Arc<SharedState>,
    /// Committed steering angle
    angle: i32,
    /// Turn direction of the course, latched when the first curve is detected
    course_direction: Direction,
    /// Side of the last successful search step
    last_bump: Direction,
    /// Only lines found driving forward count; set across dashed segments
    forward_only: bool,
}

impl<A: Actuation> Navigator<A> {
    pub fn new(act: A, config: VehicleConfig, shared: Arc<SharedState>) -> Self {
        Self {
            act,
            config,
            shared,
            angle: 0,
            course_direction: Direction::Positive,
            last_bump: Direction::Positive,
            forward_only: false,
        }
    }

    pub fn angle(&self) -> i32 {
        self.angle
    }

    pub fn course_direction(&self) -> Direction {
        self.course_direction
    }

    /// Run the course from the configured start stage.
    pub fn run(&mut self) -> Result<RunOutcome> {
        match self.run_course() {
            Err(Error::Shutdown) => {
                let stage = self.shared.stage();
                log::info!("Navigator stopped in {}", stage);
                if let Err(e) = self.act.stop() {
                    log::debug!("Navigator: stop after shutdown failed: {}", e);
                }
                Ok(RunOutcome::Stopped { stage })
            }
            other => other,
        }
    }

    fn run_course(&mut self) -> Result<RunOutcome> {
        if self.config.sensors.start_on_touch {
            log::info!("Navigator waiting for start button");
            self.act.wait_for_start()?;
        }

        let mut stage = self.config.course.start_stage;
        loop {
            self.shared.set_stage(stage);
            log::info!("Navigator entering {}", stage);

            match self.run_stage(stage)? {
                Transition::Next(next) => stage = next,
                Transition::Failed => {
                    self.shared.set_debug(0);
                    self.act.stop()?;
                    log::error!(
                        "Line lost in {} at angle {}; vehicle stopped",
                        stage,
                        self.angle
                    );
                    return Ok(RunOutcome::LineLost { stage });
                }
            }
        }
    }

    /// Make `angle` the committed steering angle.
    fn commit_angle(&mut self, angle: i32) {
        self.angle = angle;
        self.shared.set_debug(angle);
    }
}
