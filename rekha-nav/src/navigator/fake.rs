//! Scripted [`Actuation`] for navigator tests.

use std::collections::VecDeque;

use super::link::Actuation;
use crate::error::{Error, Result};
use crate::vector::Direction;

/// One primitive as issued by the navigator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Steer(i32),
    WhileOnLine(Direction, u32),
    UntilFound(Direction, u32),
    Distance(Direction, i32),
    Stop,
    Start,
}

type Finder = Box<dyn FnMut(i32, Direction) -> bool + Send>;

/// Line losses come from a queue of edge positions; running out of losses
/// ends the run with [`Error::Shutdown`]. Whether a search drive finds the
/// line is decided by `finds(steering angle, direction)`.
pub(crate) struct FakeActuation {
    pub on_line: bool,
    pub obstacle: bool,
    pub obstacle_watch: bool,
    pub steer: i32,
    pub position: i32,
    pub edge: i32,
    pub calls: Vec<Call>,
    finds: Finder,
    losses: VecDeque<i32>,
    obstacle_at: Option<i32>,
}

impl FakeActuation {
    pub fn new(finds: impl FnMut(i32, Direction) -> bool + Send + 'static) -> Self {
        Self {
            on_line: true,
            obstacle: false,
            obstacle_watch: false,
            steer: 0,
            position: 0,
            edge: 0,
            calls: Vec::new(),
            finds: Box::new(finds),
            losses: VecDeque::new(),
            obstacle_at: None,
        }
    }

    pub fn with_losses(mut self, edges: &[i32]) -> Self {
        self.losses.extend(edges);
        self
    }

    /// The obstacle appears with the loss at `edge`.
    pub fn with_obstacle_at(mut self, edge: i32) -> Self {
        self.obstacle_at = Some(edge);
        self
    }

    pub fn steers(&self) -> Vec<i32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Steer(angle) => Some(*angle),
                _ => None,
            })
            .collect()
    }

    pub fn losses_left(&self) -> usize {
        self.losses.len()
    }
}

impl Actuation for FakeActuation {
    fn drive_while_on_line(
        &mut self,
        _speed: i32,
        direction: Direction,
        timeout: u32,
    ) -> Result<bool> {
        self.calls.push(Call::WhileOnLine(direction, timeout));
        if !self.on_line {
            return Ok(true);
        }
        let edge = self.losses.pop_front().ok_or(Error::Shutdown)?;
        self.edge = edge;
        self.position = edge;
        self.on_line = false;
        if self.obstacle_at == Some(edge) {
            self.obstacle = true;
        }
        Ok(true)
    }

    fn drive_until_line_found(
        &mut self,
        _speed: i32,
        direction: Direction,
        timeout: u32,
    ) -> Result<bool> {
        self.calls.push(Call::UntilFound(direction, timeout));
        if self.on_line {
            return Ok(true);
        }
        if self.obstacle_watch && self.obstacle {
            return Ok(false);
        }
        self.on_line = (self.finds)(self.steer, direction);
        Ok(self.on_line)
    }

    fn drive_distance(
        &mut self,
        _speed: i32,
        direction: Direction,
        distance: i32,
        _timeout: u32,
    ) -> Result<()> {
        self.calls.push(Call::Distance(direction, distance));
        self.position = self.position.saturating_add(direction * distance);
        Ok(())
    }

    fn steer_to(&mut self, angle: i32) -> Result<()> {
        self.calls.push(Call::Steer(angle));
        self.steer = angle;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.push(Call::Stop);
        Ok(())
    }

    fn on_line(&self) -> bool {
        self.on_line
    }

    fn obstacle(&self) -> bool {
        self.obstacle
    }

    fn drive_position(&self) -> i32 {
        self.position
    }

    fn line_edge_position(&self) -> i32 {
        self.edge
    }

    fn set_obstacle_watch(&mut self, armed: bool) {
        self.obstacle_watch = armed;
    }

    fn wait_for_start(&mut self) -> Result<()> {
        self.calls.push(Call::Start);
        Ok(())
    }
}
