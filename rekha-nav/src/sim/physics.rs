//! Front-steered vehicle kinematics.
//!
//! Bicycle model around the rear axle: heading rate is `v / wheel_base ·
//! tan(wheel angle)`. Positive steering turns right (clockwise).

use super::geometry::{Course, inside_circle, normalize_angle, ray_to_circle};
use crate::config::SimulationConfig;

/// Simulated motors and pose.
pub struct VehiclePhysics {
    /// Rear axle position (cm)
    x: f32,
    y: f32,
    /// Heading (radians, CCW from +X)
    theta: f32,
    /// Steering motor counter, kept fractional between reads
    steer_position: f32,
    /// Drive motor counter
    drive_position: f32,
    steer_power: i32,
    drive_power: i32,
}

impl VehiclePhysics {
    /// Place the light sensor on the start of the course, facing along it.
    pub fn on_course(course: &Course, config: &SimulationConfig) -> Self {
        let ([sx, sy], theta) = course.start();
        Self {
            x: sx - config.sensor_offset * theta.cos(),
            y: sy - config.sensor_offset * theta.sin(),
            theta,
            steer_position: 0.0,
            drive_position: 0.0,
            steer_power: 0,
            drive_power: 0,
        }
    }

    #[inline]
    pub fn pose(&self) -> (f32, f32, f32) {
        (self.x, self.y, self.theta)
    }

    pub fn sensor_point(&self, config: &SimulationConfig) -> [f32; 2] {
        [
            self.x + config.sensor_offset * self.theta.cos(),
            self.y + config.sensor_offset * self.theta.sin(),
        ]
    }

    pub fn steer_position(&self) -> i32 {
        self.steer_position.round() as i32
    }

    pub fn drive_position(&self) -> i32 {
        self.drive_position.round() as i32
    }

    pub fn set_steer_power(&mut self, power: i32) {
        self.steer_power = power.clamp(-100, 100);
    }

    pub fn set_drive_power(&mut self, power: i32) {
        self.drive_power = power.clamp(-100, 100);
    }

    /// Advance by `dt` seconds. Returns true if the obstacle blocked motion.
    pub fn update(&mut self, dt: f32, config: &SimulationConfig) -> bool {
        self.steer_position += self.steer_power as f32 / 100.0 * config.steer_rate * dt;

        let speed = self.drive_power as f32 / 100.0 * config.max_ground_speed;
        if speed == 0.0 {
            return false;
        }

        let wheel_angle = (self.steer_position * config.steer_ratio).to_radians();
        let yaw_rate = -speed / config.wheel_base * wheel_angle.tan();
        let theta = normalize_angle(self.theta + yaw_rate * dt);
        let x = self.x + speed * self.theta.cos() * dt;
        let y = self.y + speed * self.theta.sin() * dt;

        if let Some(obstacle) = &config.obstacle {
            let front = [
                x + config.sensor_offset * theta.cos(),
                y + config.sensor_offset * theta.sin(),
            ];
            if inside_circle(front, obstacle) || inside_circle([x, y], obstacle) {
                return true;
            }
        }

        self.x = x;
        self.y = y;
        self.theta = theta;
        self.drive_position += speed * dt * config.counts_per_cm;
        false
    }

    /// True when the light sensor is over the line.
    pub fn over_line(&self, course: &Course, config: &SimulationConfig) -> bool {
        let [sx, sy] = self.sensor_point(config);
        course.distance(sx, sy) <= config.line_width / 2.0
    }

    /// Forward range from the sensor to the obstacle, capped at `max_range`.
    pub fn range(&self, config: &SimulationConfig) -> i32 {
        config
            .obstacle
            .as_ref()
            .and_then(|obstacle| ray_to_circle(self.sensor_point(config), self.theta, obstacle))
            .map_or(config.max_range, |d| (d.round() as i32).min(config.max_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObstacleSpec;

    fn setup() -> (Course, SimulationConfig) {
        let config = SimulationConfig {
            course: vec![[0.0, 0.0], [200.0, 0.0]],
            ..SimulationConfig::default()
        };
        (Course::new(config.course.clone()), config)
    }

    #[test]
    fn test_starts_over_line() {
        let (course, config) = setup();
        let physics = VehiclePhysics::on_course(&course, &config);
        assert!(physics.over_line(&course, &config));
        assert_eq!(physics.range(&config), config.max_range);
    }

    #[test]
    fn test_straight_drive_counts() {
        let (course, config) = setup();
        let mut physics = VehiclePhysics::on_course(&course, &config);
        physics.set_drive_power(100);
        for _ in 0..100 {
            physics.update(0.01, &config);
        }
        // 1s at 30cm/s, 20 counts/cm
        assert!((physics.drive_position() - 600).abs() <= 1);
        assert!(physics.over_line(&course, &config));
    }

    #[test]
    fn test_positive_steering_turns_right() {
        let (course, config) = setup();
        let mut physics = VehiclePhysics::on_course(&course, &config);
        physics.set_steer_power(100);
        physics.update(0.1, &config);
        assert_eq!(physics.steer_position(), 30);

        physics.set_steer_power(0);
        physics.set_drive_power(60);
        for _ in 0..50 {
            physics.update(0.01, &config);
        }
        let (_, y, theta) = physics.pose();
        assert!(theta < 0.0);
        assert!(y < 0.0);
    }

    #[test]
    fn test_obstacle_blocks_and_ranges() {
        let (course, mut config) = setup();
        config.obstacle = Some(ObstacleSpec {
            x: 30.0,
            y: 0.0,
            radius: 5.0,
        });
        let mut physics = VehiclePhysics::on_course(&course, &config);
        assert_eq!(physics.range(&config), 25);

        physics.set_drive_power(100);
        let mut blocked = false;
        for _ in 0..200 {
            blocked |= physics.update(0.01, &config);
        }
        assert!(blocked);
        assert!(physics.range(&config) <= 1);
    }
}
