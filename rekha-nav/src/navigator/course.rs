//! Course stages and their transition functions.
//!
//! Each stage is a loop alternating a drive along the line with one or more
//! heading corrections, and returns the stage to continue with. Stages only
//! move forward through the course, apart from the loop back into curve
//! following after the obstacle.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Navigator;
use super::link::Actuation;
use super::search::{CURVE_CHAIN, Strategy};
use crate::error::Result;
use crate::vector::Direction;

/// Phase of the known course.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Stage {
    #[default]
    StraightTrack,
    CurveTrack,
    DashedTrack,
    SharpTurn,
    ObstacleManeuver,
    Resume,
    Idle,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::StraightTrack,
        Stage::CurveTrack,
        Stage::DashedTrack,
        Stage::SharpTurn,
        Stage::ObstacleManeuver,
        Stage::Resume,
        Stage::Idle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::StraightTrack => "StraightTrack",
            Stage::CurveTrack => "CurveTrack",
            Stage::DashedTrack => "DashedTrack",
            Stage::SharpTurn => "SharpTurn",
            Stage::ObstacleManeuver => "ObstacleManeuver",
            Stage::Resume => "Resume",
            Stage::Idle => "Idle",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown stage '{}'", s))
    }
}

/// Result of running one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Transition {
    Next(Stage),
    /// Every recovery strategy failed
    Failed,
}

impl<A: Actuation> Navigator<A> {
    pub(super) fn run_stage(&mut self, stage: Stage) -> Result<Transition> {
        match stage {
            Stage::StraightTrack => self.straight_track(),
            Stage::CurveTrack => self.curve_track(),
            Stage::DashedTrack => self.dashed_track(),
            Stage::SharpTurn => self.sharp_turn(),
            Stage::ObstacleManeuver => self.obstacle_maneuver(),
            Stage::Resume => self.resume(),
            Stage::Idle => self.idle(),
        }
    }

    fn follow(&mut self) -> Result<bool> {
        let speed = self.config.drive.max_speed;
        self.act.drive_while_on_line(speed, Direction::FORWARD, 0)
    }

    /// Small symmetric corrections. Drive distance accumulated while the
    /// corrections keep turning the same way marks the start of the curve.
    fn straight_track(&mut self) -> Result<Transition> {
        let bump = self.config.search.straight_bump;
        let timeout = self.config.search.probe_timeout;
        let threshold = self.config.course.curvature_threshold;
        let max_step = self.config.search.max_step;

        let mut mark = self.act.drive_position();
        let mut cumulative = 0i32;
        let mut last_turn: Option<Direction> = None;

        loop {
            self.follow()?;
            let edge = self.act.line_edge_position();
            let delta = edge.saturating_sub(mark).saturating_abs();
            mark = edge;

            if !self.symmetric_finder(self.last_bump, bump, 0, max_step, timeout)? {
                log::warn!("StraightTrack: line lost at drive {}", edge);
                return Ok(Transition::Failed);
            }

            let turn = self.last_bump;
            cumulative = if last_turn == Some(turn) {
                cumulative.saturating_add(delta)
            } else {
                delta
            };
            last_turn = Some(turn);
            log::debug!(
                "StraightTrack: delta={} cumulative={} turn={:?}",
                delta,
                cumulative,
                turn
            );

            if cumulative > threshold {
                self.course_direction = turn;
                log::info!("StraightTrack: curve ahead, course direction {:?}", turn);
                return Ok(Transition::Next(Stage::CurveTrack));
            }
        }
    }

    /// Full fallback chain until the deflection has been large and returns
    /// near straight.
    fn curve_track(&mut self) -> Result<Transition> {
        let bump = self.config.search.curve_bump;
        let timeout = self.config.search.probe_timeout;
        let mut entered = false;

        loop {
            self.follow()?;
            if self.recover(&CURVE_CHAIN, bump, timeout)?.is_none() {
                return Ok(Transition::Failed);
            }

            let deflection = self.angle.saturating_abs();
            if deflection >= self.config.course.curve_band {
                entered = true;
            }
            if entered && deflection <= self.config.course.straight_band {
                return Ok(Transition::Next(Stage::DashedTrack));
            }
        }
    }

    /// Gaps are expected: probe across them first, search only when the
    /// probe misses, and treat repeated misses as the end of the dashes.
    ///
    /// Runs in forward-only mode: the corrective reverse leg of a probe lands
    /// back on the dash just left, which says nothing about the gap ahead.
    fn dashed_track(&mut self) -> Result<Transition> {
        self.forward_only = true;
        let result = self.dashed_track_loop();
        self.forward_only = false;
        result
    }

    fn dashed_track_loop(&mut self) -> Result<Transition> {
        let speed = self.config.drive.max_speed;
        let bump = self.config.search.straight_bump;
        let probe_timeout = self.config.search.probe_timeout;
        let max_step = self.config.search.max_step;
        let course = self.config.course.clone();
        let mut failures = 0u32;

        loop {
            self.follow()?;
            if self.probe_forward(course.dash_timeout)? {
                failures = 0;
                continue;
            }
            if self.symmetric_finder(self.last_bump, bump, 0, max_step, probe_timeout)? {
                failures = 0;
                continue;
            }

            failures += 1;
            log::warn!("DashedTrack: search failed ({} in a row)", failures);
            if failures >= course.dash_failure_limit {
                return Ok(Transition::Next(Stage::SharpTurn));
            }

            // Long gap: straighten to the last good heading and bridge it
            self.act.steer_to(self.angle)?;
            if !self.seek_ahead(speed, course.gap_bridge_timeout)? {
                return Ok(Transition::Next(Stage::SharpTurn));
            }
        }
    }

    /// Three-point turns only; an obstacle ends the stage.
    fn sharp_turn(&mut self) -> Result<Transition> {
        self.act.set_obstacle_watch(true);
        let result = self.sharp_turn_loop();
        self.act.set_obstacle_watch(false);
        result
    }

    fn sharp_turn_loop(&mut self) -> Result<Transition> {
        let timeout = self.config.search.probe_timeout;
        loop {
            if self.act.obstacle() {
                return Ok(Transition::Next(Stage::ObstacleManeuver));
            }
            self.follow()?;
            if self.act.obstacle() {
                return Ok(Transition::Next(Stage::ObstacleManeuver));
            }
            if !self.hard_three_point_turn(timeout)? {
                return Ok(if self.act.obstacle() {
                    Transition::Next(Stage::ObstacleManeuver)
                } else {
                    Transition::Failed
                });
            }
        }
    }

    /// Curve following with the wider post-obstacle budget. Leaves once
    /// enough consecutive corrections were one-sided.
    fn resume(&mut self) -> Result<Transition> {
        let bump = self.config.search.curve_bump;
        let timeout = self.config.course.resume_timeout;
        let needed = self.config.course.stability_count;
        let mut stable = 0u32;

        loop {
            self.follow()?;
            match self.recover(&CURVE_CHAIN, bump, timeout)? {
                None => return Ok(Transition::Failed),
                Some(Strategy::Asymmetric(_)) => stable += 1,
                Some(_) => stable = 0,
            }
            log::debug!("Resume: stability {}/{}", stable, needed);
            if stable >= needed {
                return Ok(Transition::Next(Stage::Idle));
            }
        }
    }

    /// Finish straight: alternate finding and following forever.
    fn idle(&mut self) -> Result<Transition> {
        let speed = self.config.drive.max_speed;
        self.act.steer_to(0)?;
        self.commit_angle(0);
        loop {
            self.act
                .drive_until_line_found(speed, Direction::FORWARD, 0)?;
            self.act.drive_while_on_line(speed, Direction::FORWARD, 0)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::{Call, FakeActuation};
    use super::*;
    use crate::config::VehicleConfig;
    use crate::error::Error;
    use crate::shared::SharedState;
    use std::sync::Arc;

    fn navigator(fake: FakeActuation) -> Navigator<FakeActuation> {
        Navigator::new(
            fake,
            VehicleConfig::default(),
            Arc::new(SharedState::default()),
        )
    }

    #[test]
    fn test_stage_parse_and_display() {
        assert_eq!("dashedtrack".parse::<Stage>(), Ok(Stage::DashedTrack));
        assert_eq!(Stage::ObstacleManeuver.to_string(), "ObstacleManeuver");
        assert!("corner".parse::<Stage>().is_err());
    }

    #[test]
    fn test_straight_delta_over_threshold_enters_curve() {
        let fake = FakeActuation::new(|steer, _| steer == 4).with_losses(&[150]);
        let mut nav = navigator(fake);

        let transition = nav.straight_track().unwrap();
        assert_eq!(transition, Transition::Next(Stage::CurveTrack));
        assert_eq!(nav.course_direction, Direction::Positive);
        assert_eq!(nav.angle, 4);
    }

    #[test]
    fn test_straight_latches_last_bump_direction() {
        let fake = FakeActuation::new(|steer, _| steer == -4).with_losses(&[150]);
        let mut nav = navigator(fake);

        assert_eq!(
            nav.straight_track().unwrap(),
            Transition::Next(Stage::CurveTrack)
        );
        assert_eq!(nav.course_direction, Direction::Negative);
    }

    #[test]
    fn test_straight_alternating_corrections_stay_on_straight() {
        // Corrections alternate sides every 80 counts: never a curve
        let mut toggle = false;
        let fake = FakeActuation::new(move |steer, _| {
            let hit = if toggle { steer < 0 } else { steer > 0 };
            if hit {
                toggle = !toggle;
            }
            hit
        })
        .with_losses(&[80, 160, 240, 320]);
        let mut nav = navigator(fake);

        assert!(matches!(nav.straight_track(), Err(Error::Shutdown)));
    }

    #[test]
    fn test_straight_exhaustion_is_fatal() {
        let fake = FakeActuation::new(|_, _| false).with_losses(&[40]);
        let mut nav = navigator(fake);

        assert_eq!(nav.straight_track().unwrap(), Transition::Failed);
        assert_eq!(nav.angle, 0);
    }

    #[test]
    fn test_curve_exits_after_returning_to_straight() {
        // Line found only once the steering reached each expected heading
        let headings = [30, 20, 10, 0];
        let mut next = 0usize;
        let fake = FakeActuation::new(move |steer, _| {
            if next < headings.len() && steer == headings[next] {
                next += 1;
                true
            } else {
                false
            }
        })
        .with_losses(&[10, 20, 30, 40]);
        let mut nav = navigator(fake);
        nav.angle = 40;
        nav.course_direction = Direction::Negative;

        assert_eq!(
            nav.curve_track().unwrap(),
            Transition::Next(Stage::DashedTrack)
        );
        assert_eq!(nav.angle, 0);
    }

    #[test]
    fn test_dashed_gaps_are_probed_not_searched() {
        let fake = FakeActuation::new(|steer, direction| {
            steer == 0 && direction == Direction::FORWARD
        })
        .with_losses(&[100, 200]);
        let mut nav = navigator(fake);

        assert!(matches!(nav.dashed_track(), Err(Error::Shutdown)));
        assert!(nav.act.steers().is_empty());
    }

    #[test]
    fn test_dashed_unbridgeable_gap_ends_segment() {
        let fake = FakeActuation::new(|_, _| false).with_losses(&[100]);
        let mut nav = navigator(fake);

        assert_eq!(
            nav.dashed_track().unwrap(),
            Transition::Next(Stage::SharpTurn)
        );
        let bridges = nav
            .act
            .calls
            .iter()
            .filter(|call| matches!(call, Call::UntilFound(Direction::Positive, 100)))
            .count();
        assert_eq!(bridges, 1);
    }

    #[test]
    fn test_dashed_repeated_failure_ends_segment() {
        // Probe (2 legs) + symmetric sweep (50 candidates, 2 legs each) miss,
        // then the gap bridge finds the line; the next gap misses again.
        let mut calls = 0;
        let fake = FakeActuation::new(move |_, _| {
            calls += 1;
            calls == 103
        })
        .with_losses(&[100, 200]);
        let mut nav = navigator(fake);

        assert_eq!(
            nav.dashed_track().unwrap(),
            Transition::Next(Stage::SharpTurn)
        );
        assert_eq!(nav.act.losses_left(), 0);
    }

    #[test]
    fn test_dashed_reverse_landings_do_not_bridge_gaps() {
        // Only the corrective reverse legs ever see the line
        let losses: Vec<i32> = (1..=200).collect();
        let fake = FakeActuation::new(|_, direction| direction == Direction::REVERSE)
            .with_losses(&losses);
        let mut nav = navigator(fake);

        assert_eq!(
            nav.dashed_track().unwrap(),
            Transition::Next(Stage::SharpTurn)
        );
        assert!(!nav.forward_only);
        assert!(nav.act.losses_left() > 0);
    }

    #[test]
    fn test_sharp_turn_without_obstacle_failure_is_fatal() {
        let fake = FakeActuation::new(|_, _| false).with_losses(&[10]);
        let mut nav = navigator(fake);

        assert_eq!(nav.sharp_turn().unwrap(), Transition::Failed);
        assert!(!nav.act.obstacle_watch);
    }

    #[test]
    fn test_sharp_turn_hands_over_to_obstacle() {
        let fake = FakeActuation::new(|_, _| true)
            .with_losses(&[10, 20])
            .with_obstacle_at(20);
        let mut nav = navigator(fake);

        assert_eq!(
            nav.sharp_turn().unwrap(),
            Transition::Next(Stage::ObstacleManeuver)
        );
        assert!(!nav.act.obstacle_watch);
    }

    #[test]
    fn test_resume_needs_consecutive_asymmetric_corrections() {
        // Every course-side candidate succeeds at once
        let fake = FakeActuation::new(|steer, _| steer > 0).with_losses(&[1, 2, 3]);
        let mut nav = navigator(fake);
        nav.course_direction = Direction::Positive;

        assert_eq!(nav.resume().unwrap(), Transition::Next(Stage::Idle));
        assert_eq!(nav.angle, 30);
    }

    #[test]
    fn test_resume_resets_stability_on_other_strategies() {
        // Asymmetric hit at 10, then only a plain probe at 10 recovers, then
        // an asymmetric hit at 20.
        let mut hits = 0;
        let fake = FakeActuation::new(move |steer, direction| {
            let wanted = if hits < 2 { 10 } else { 20 };
            let hit = steer == wanted && direction == Direction::FORWARD;
            if hit {
                hits += 1;
            }
            hit
        })
        .with_losses(&[1, 2, 3]);
        let mut nav = navigator(fake);
        nav.course_direction = Direction::Positive;
        nav.config.course.stability_count = 2;

        assert!(matches!(nav.resume(), Err(Error::Shutdown)));
        assert_eq!(nav.angle, 20);
    }
}
