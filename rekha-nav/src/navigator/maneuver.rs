//! Fixed obstacle choreography.
//!
//! Built for one known obstacle geometry: leave the line away from the turn,
//! pass the obstacle, arc back onto the line, back over it, reverse into
//! contact and turn into the following corner. Nothing here adapts to what
//! the sensors report, except that the arc back must find the line.

use super::Navigator;
use super::course::{Stage, Transition};
use super::link::Actuation;
use crate::error::Result;
use crate::vector::Direction;

impl<A: Actuation> Navigator<A> {
    pub(super) fn obstacle_maneuver(&mut self) -> Result<Transition> {
        let plan = self.config.obstacle.clone();
        let seek = self.config.drive.seek_speed;
        let side = self.course_direction;
        let away = side.opposite();

        log::info!("Obstacle maneuver: passing on the {:?} side", away);
        self.act.stop()?;

        self.act.steer_to(away * plan.away_angle)?;
        self.act.drive_distance(
            seek,
            Direction::FORWARD,
            plan.first_seek_distance,
            plan.first_seek_timeout,
        )?;

        self.act.steer_to(0)?;
        self.act.drive_distance(
            seek,
            Direction::FORWARD,
            plan.second_seek_distance,
            plan.second_seek_timeout,
        )?;

        self.act.steer_to(side * plan.arc_angle)?;
        if !self
            .act
            .drive_until_line_found(seek, Direction::FORWARD, plan.return_seek_timeout)?
        {
            log::warn!("Obstacle maneuver: line not found after the arc");
            return Ok(Transition::Failed);
        }

        self.act.steer_to(away * plan.realign_angle)?;
        self.act
            .drive_while_on_line(seek, Direction::REVERSE, plan.back_timeout)?;
        self.act.drive_distance(
            seek,
            Direction::REVERSE,
            plan.contact_distance,
            plan.contact_timeout,
        )?;

        let (corner, _) = self
            .config
            .steering
            .clamp_angle(side * plan.corner_angle);
        self.act.steer_to(corner)?;
        self.commit_angle(corner);
        self.last_bump = side;

        Ok(Transition::Next(Stage::Resume))
    }
}
