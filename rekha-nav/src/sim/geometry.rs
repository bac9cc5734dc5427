//! Plane geometry for the simulated course (cm, radians CCW from +X).

use std::f32::consts::{PI, TAU};

use crate::config::ObstacleSpec;

/// Line centre as a polyline.
#[derive(Clone, Debug)]
pub struct Course {
    points: Vec<[f32; 2]>,
}

impl Course {
    pub fn new(points: Vec<[f32; 2]>) -> Self {
        Self { points }
    }

    /// Shortest distance from `(x, y)` to the polyline.
    pub fn distance(&self, x: f32, y: f32) -> f32 {
        self.points
            .windows(2)
            .map(|seg| segment_distance([x, y], seg[0], seg[1]))
            .fold(f32::INFINITY, f32::min)
    }

    /// Position and heading at the start of the first segment.
    pub fn start(&self) -> ([f32; 2], f32) {
        match self.points.as_slice() {
            [a, b, ..] => (*a, (b[1] - a[1]).atan2(b[0] - a[0])),
            [a] => (*a, 0.0),
            [] => ([0.0, 0.0], 0.0),
        }
    }
}

fn segment_distance(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}

/// Distance along a ray from `origin` with `heading` to the obstacle edge.
pub fn ray_to_circle(origin: [f32; 2], heading: f32, circle: &ObstacleSpec) -> Option<f32> {
    let (dx, dy) = (heading.cos(), heading.sin());
    let (ox, oy) = (origin[0] - circle.x, origin[1] - circle.y);

    // |o + t·d|² = r², d is a unit vector
    let b = ox * dx + oy * dy;
    let c = ox * ox + oy * oy - circle.radius * circle.radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

pub fn inside_circle(point: [f32; 2], circle: &ObstacleSpec) -> bool {
    (point[0] - circle.x).powi(2) + (point[1] - circle.y).powi(2)
        < circle.radius * circle.radius
}

/// Normalize angle to [-π, π)
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a >= PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}
