//! Line re-acquisition.
//!
//! All searches work on the navigator's committed steering angle. A candidate
//! angle is only committed when a probe from it finds the line; a failed
//! search leaves the committed angle where it was.

use super::Navigator;
use super::link::Actuation;
use crate::error::Result;
use crate::vector::Direction;

/// Side an asymmetric search starts on, relative to the course direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bias {
    Course,
    Opposite,
}

/// One recovery strategy of a fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Asymmetric(Bias),
    Symmetric,
    /// Plain probe at the committed angle
    Probe,
    ThreePointTurn,
}

/// Fallback chain used while following curves.
pub const CURVE_CHAIN: [Strategy; 5] = [
    Strategy::Asymmetric(Bias::Course),
    Strategy::Asymmetric(Bias::Opposite),
    Strategy::Symmetric,
    Strategy::Probe,
    Strategy::ThreePointTurn,
];

impl<A: Actuation> Navigator<A> {
    /// Forward probe, then a corrective reverse probe one tick longer.
    ///
    /// A line found by the reverse probe counts as success only when
    /// `search.accept_reverse_hit` is set and the navigator is not in
    /// forward-only mode.
    pub fn probe_forward(&mut self, timeout: u32) -> Result<bool> {
        let speed = self.config.drive.max_speed;
        if self.seek_ahead(speed, timeout)? {
            return Ok(true);
        }

        let back = self.act.drive_until_line_found(
            speed,
            Direction::REVERSE,
            timeout.saturating_add(1),
        )?;
        Ok(back && self.config.search.accept_reverse_hit && !self.forward_only)
    }

    /// Forward leg of a probe.
    ///
    /// In forward-only mode a vehicle still standing on a line first runs off
    /// it, so only a new stretch of line ahead counts as found.
    pub(super) fn seek_ahead(&mut self, speed: i32, timeout: u32) -> Result<bool> {
        if self.forward_only
            && self.act.on_line()
            && !self
                .act
                .drive_while_on_line(speed, Direction::FORWARD, timeout)?
        {
            // Never ran off it
            return Ok(true);
        }
        self.act
            .drive_until_line_found(speed, Direction::FORWARD, timeout)
    }

    /// Expanding sweep alternating sides around the committed angle.
    ///
    /// Step `k` tries `angle + k·bump` on the `primary` side, then the mirror
    /// on the other side. Each side is dropped once its candidate saturates
    /// at the hard limit. `max_step == 0` sweeps until both sides are dropped.
    pub fn symmetric_finder(
        &mut self,
        primary: Direction,
        bump: i32,
        min_step: u32,
        max_step: u32,
        timeout: u32,
    ) -> Result<bool> {
        let base = self.angle;
        let sides = [primary, primary.opposite()];
        let mut exhausted = [false, false];
        let mut step = min_step;

        while exhausted.contains(&false) {
            step += 1;
            if max_step != 0 && step > max_step {
                break;
            }
            for (side, direction) in sides.into_iter().enumerate() {
                if exhausted[side] {
                    continue;
                }
                let (candidate, saturated) = self.candidate(base, direction, step, bump);
                exhausted[side] = saturated;
                if self.try_candidate(candidate, timeout)? {
                    self.last_bump = direction;
                    return Ok(true);
                }
            }
        }

        log::warn!(
            "Symmetric search from {} exhausted after {} steps",
            base,
            step
        );
        Ok(false)
    }

    /// One-sided sweep; gives up once the side saturates without a hit.
    pub fn asymmetric_finder(
        &mut self,
        direction: Direction,
        bump: i32,
        min_step: u32,
        max_step: u32,
        timeout: u32,
    ) -> Result<bool> {
        let base = self.angle;
        let mut step = min_step;

        loop {
            step += 1;
            if max_step != 0 && step > max_step {
                return Ok(false);
            }
            let (candidate, saturated) = self.candidate(base, direction, step, bump);
            if self.try_candidate(candidate, timeout)? {
                self.last_bump = direction;
                return Ok(true);
            }
            if saturated {
                log::debug!("Asymmetric search {:?} from {} exhausted", direction, base);
                return Ok(false);
            }
        }
    }

    /// Reverse out of a corner on the mirrored angle.
    ///
    /// On a hit the deflection is doubled (saturating) and committed.
    /// Otherwise the committed angle is restored for one last probe.
    pub fn hard_three_point_turn(&mut self, timeout: u32) -> Result<bool> {
        let speed = self.config.drive.max_speed;
        let committed = self.angle;
        let (mirror, _) = self.config.steering.clamp_angle(committed.saturating_neg());

        log::debug!("Three-point turn: reversing at {}", mirror);
        self.act.steer_to(mirror)?;
        if self
            .act
            .drive_until_line_found(speed, Direction::REVERSE, timeout)?
        {
            let (doubled, _) = self
                .config
                .steering
                .clamp_angle(committed.saturating_mul(2));
            self.act.steer_to(doubled)?;
            self.commit_angle(doubled);
            return Ok(true);
        }

        self.act.steer_to(committed)?;
        self.probe_forward(timeout)
    }

    /// Evaluate `chain` in order; returns the strategy that found the line.
    pub fn recover(
        &mut self,
        chain: &[Strategy],
        bump: i32,
        timeout: u32,
    ) -> Result<Option<Strategy>> {
        let max_step = self.config.search.max_step;
        for &strategy in chain {
            let found = match strategy {
                Strategy::Asymmetric(bias) => {
                    let direction = match bias {
                        Bias::Course => self.last_bump,
                        Bias::Opposite => self.last_bump.opposite(),
                    };
                    self.asymmetric_finder(direction, bump, 0, max_step, timeout)?
                }
                Strategy::Symmetric => {
                    self.symmetric_finder(self.last_bump, bump, 0, max_step, timeout)?
                }
                Strategy::Probe => {
                    self.act.steer_to(self.angle)?;
                    self.probe_forward(timeout)?
                }
                Strategy::ThreePointTurn => self.hard_three_point_turn(timeout)?,
            };
            if found {
                log::debug!("Recovered with {:?} at angle {}", strategy, self.angle);
                return Ok(Some(strategy));
            }
        }
        log::warn!("Every recovery strategy failed at angle {}", self.angle);
        Ok(None)
    }

    fn candidate(&self, base: i32, direction: Direction, step: u32, bump: i32) -> (i32, bool) {
        let offset = i32::try_from(step)
            .unwrap_or(i32::MAX)
            .saturating_mul(bump);
        let raw = base.saturating_add(direction * offset);
        self.config.steering.clamp_angle(raw)
    }

    fn try_candidate(&mut self, candidate: i32, timeout: u32) -> Result<bool> {
        log::debug!("Search candidate {}", candidate);
        self.act.steer_to(candidate)?;
        if self.probe_forward(timeout)? {
            self.commit_angle(candidate);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::{Call, FakeActuation};
    use super::*;
    use crate::config::VehicleConfig;
    use crate::shared::SharedState;
    use std::sync::Arc;

    fn navigator(fake: FakeActuation) -> Navigator<FakeActuation> {
        let mut fake = fake;
        fake.on_line = false;
        Navigator::new(
            fake,
            VehicleConfig::default(),
            Arc::new(SharedState::default()),
        )
    }

    #[test]
    fn test_probe_with_line_present_never_reverses() {
        let mut fake = FakeActuation::new(|_, _| false);
        fake.on_line = true;
        let mut nav = Navigator::new(
            fake,
            VehicleConfig::default(),
            Arc::new(SharedState::default()),
        );

        assert!(nav.probe_forward(30).unwrap());
        assert_eq!(nav.act.calls, vec![Call::UntilFound(Direction::FORWARD, 30)]);
    }

    #[test]
    fn test_probe_reverse_leg_is_one_tick_longer() {
        let mut nav = navigator(FakeActuation::new(|_, direction| {
            direction == Direction::REVERSE
        }));

        assert!(nav.probe_forward(30).unwrap());
        assert_eq!(
            nav.act.calls,
            vec![
                Call::UntilFound(Direction::FORWARD, 30),
                Call::UntilFound(Direction::REVERSE, 31),
            ]
        );
    }

    #[test]
    fn test_probe_reverse_hit_can_be_rejected() {
        let mut nav = navigator(FakeActuation::new(|_, direction| {
            direction == Direction::REVERSE
        }));
        nav.config.search.accept_reverse_hit = false;

        assert!(!nav.probe_forward(30).unwrap());
    }

    #[test]
    fn test_symmetric_sequence_alternates_and_saturates() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));
        nav.config.steering.hard_limit = 25;

        assert!(!nav.symmetric_finder(Direction::Positive, 10, 0, 0, 30).unwrap());
        assert_eq!(nav.act.steers(), vec![10, -10, 20, -20, 25, -25]);
        assert_eq!(nav.angle, 0);
    }

    #[test]
    fn test_symmetric_visits_each_side_at_most_ceil_limit_over_bump() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));

        assert!(!nav.symmetric_finder(Direction::Negative, 30, 0, 0, 30).unwrap());
        let steers = nav.act.steers();
        assert_eq!(steers, vec![-30, 30, -60, 60, -90, 90, -100, 100]);
        assert_eq!(steers.iter().filter(|&&s| s > 0).count(), 4);
    }

    #[test]
    fn test_symmetric_sides_saturate_independently() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));
        nav.angle = 80;

        assert!(!nav.symmetric_finder(Direction::Positive, 10, 0, 0, 30).unwrap());
        let steers = nav.act.steers();
        assert_eq!(&steers[..5], &[90, 70, 100, 60, 50]);
        assert_eq!(steers.last(), Some(&-100));
        assert_eq!(nav.angle, 80);
    }

    #[test]
    fn test_symmetric_success_commits_candidate() {
        let mut nav = navigator(FakeActuation::new(|steer, _| steer == -20));

        assert!(nav.symmetric_finder(Direction::Positive, 10, 0, 0, 30).unwrap());
        assert_eq!(nav.act.steers(), vec![10, -10, 20, -20]);
        assert_eq!(nav.angle, -20);
        assert_eq!(nav.last_bump, Direction::Negative);
        assert_eq!(nav.shared.debug(), -20);
    }

    #[test]
    fn test_symmetric_min_and_max_step() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));

        assert!(!nav.symmetric_finder(Direction::Positive, 5, 1, 3, 30).unwrap());
        assert_eq!(nav.act.steers(), vec![10, -10, 15, -15]);
    }

    #[test]
    fn test_asymmetric_stops_at_limit() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));
        nav.angle = 60;

        assert!(!nav.asymmetric_finder(Direction::Positive, 15, 0, 0, 30).unwrap());
        assert_eq!(nav.act.steers(), vec![75, 90, 100]);
        assert_eq!(nav.angle, 60);
    }

    #[test]
    fn test_three_point_turn_doubles_on_reverse_hit() {
        let mut nav = navigator(FakeActuation::new(|steer, direction| {
            steer == -35 && direction == Direction::REVERSE
        }));
        nav.angle = 35;

        assert!(nav.hard_three_point_turn(30).unwrap());
        assert_eq!(nav.act.steers(), vec![-35, 70]);
        assert_eq!(nav.angle, 70);
    }

    #[test]
    fn test_three_point_turn_double_saturates() {
        let mut nav = navigator(FakeActuation::new(|_, direction| {
            direction == Direction::REVERSE
        }));
        nav.angle = -80;

        assert!(nav.hard_three_point_turn(30).unwrap());
        assert_eq!(nav.angle, -100);
    }

    #[test]
    fn test_three_point_turn_failure_restores_and_probes() {
        let mut nav = navigator(FakeActuation::new(|steer, direction| {
            steer == 35 && direction == Direction::FORWARD
        }));
        nav.angle = 35;

        assert!(nav.hard_three_point_turn(30).unwrap());
        assert_eq!(nav.act.steers(), vec![-35, 35]);
        assert_eq!(
            nav.act.calls,
            vec![
                Call::Steer(-35),
                Call::UntilFound(Direction::REVERSE, 30),
                Call::Steer(35),
                Call::UntilFound(Direction::FORWARD, 30),
            ]
        );
        assert_eq!(nav.angle, 35);
    }

    #[test]
    fn test_chain_falls_back_in_order() {
        let mut nav = navigator(FakeActuation::new(|steer, direction| {
            steer == 0 && direction == Direction::FORWARD
        }));
        nav.last_bump = Direction::Negative;

        let used = nav.recover(&CURVE_CHAIN, 50, 30).unwrap();
        assert_eq!(used, Some(Strategy::Probe));
        assert_eq!(
            nav.act.steers(),
            vec![-50, -100, 50, 100, -50, 50, -100, 100, 0]
        );
    }

    #[test]
    fn test_chain_starts_on_side_of_last_correction() {
        // The line bends against the latched course direction
        let mut nav = navigator(FakeActuation::new(|steer, _| steer < 0));
        nav.course_direction = Direction::Positive;
        nav.last_bump = Direction::Negative;

        let used = nav.recover(&CURVE_CHAIN, 10, 30).unwrap();
        assert_eq!(used, Some(Strategy::Asymmetric(Bias::Course)));
        assert_eq!(nav.act.steers(), vec![-10]);
        assert_eq!(nav.angle, -10);
        assert_eq!(nav.last_bump, Direction::Negative);
    }

    #[test]
    fn test_chain_reports_exhaustion() {
        let mut nav = navigator(FakeActuation::new(|_, _| false));
        nav.angle = 20;

        assert_eq!(nav.recover(&CURVE_CHAIN, 50, 30).unwrap(), None);
        assert_eq!(nav.angle, 20);
        // Three-point turn is the last resort
        assert_eq!(&nav.act.steers()[nav.act.steers().len() - 2..], &[-20, 20]);
    }
}
