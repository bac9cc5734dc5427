//! Signed delta decomposition.
//!
//! Steering errors, turn directions and drive directions are all handled as a
//! [`Direction`] plus an unsigned magnitude.

use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Sign of a motion: forward/right is `Positive`, reverse/left is `Negative`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Direction {
    #[default]
    Positive,
    Negative,
}

impl Direction {
    /// Alias used for propulsion.
    pub const FORWARD: Direction = Direction::Positive;
    /// Alias used for propulsion.
    pub const REVERSE: Direction = Direction::Negative;

    /// `+1` or `-1`.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }

    /// Direction of a signed value; zero counts as positive.
    #[inline]
    pub fn of(value: i32) -> Self {
        if value < 0 {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }
}

impl Mul<i32> for Direction {
    type Output = i32;

    fn mul(self, rhs: i32) -> i32 {
        self.sign() * rhs
    }
}

/// A signed value split into direction and magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vector {
    pub direction: Direction,
    pub magnitude: u32,
}

impl Vector {
    /// Reassemble the signed value.
    #[inline]
    pub fn signed(self) -> i32 {
        // i32::MIN has no positive counterpart; wrapping keeps it exact
        (self.magnitude as i32).wrapping_mul(self.direction.sign())
    }
}

impl From<i32> for Vector {
    fn from(value: i32) -> Self {
        Self {
            direction: Direction::of(value),
            magnitude: value.unsigned_abs(),
        }
    }
}
