//! Configuration loading for RekhaNav
//!
//! Every tuned constant of the control core lives here so that one TOML file
//! describes a complete vehicle/course variant. Missing keys fall back to the
//! tuned defaults.

use crate::error::{Error, Result};
use crate::navigator::Stage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct VehicleConfig {
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub course: CourseConfig,
    #[serde(default)]
    pub obstacle: ObstacleConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Sensor sampling and thresholding
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Sampling period (default: 10ms)
    #[serde(default = "default_sample_period")]
    pub sample_period_ms: u64,

    /// Light level below which the sensor is over the line (default: 250)
    #[serde(default = "default_light_threshold")]
    pub light_threshold: i32,

    /// Range below which an obstacle is present (default: 20)
    #[serde(default = "default_range_threshold")]
    pub range_threshold: i32,

    /// Wait for a touch-sensor press before starting the course
    #[serde(default)]
    pub start_on_touch: bool,
}

/// One step of the steering servo speed table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpeedBand {
    /// Error magnitude that must be exceeded to use this band
    pub above: u32,
    /// Motor power applied in this band
    pub speed: i32,
}

/// Steering servo and controller tick
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SteeringConfig {
    /// Position/timer controller tick (default: 10ms)
    #[serde(default = "default_tick_period")]
    pub tick_period_ms: u64,

    /// Position error accepted as "at target" (default: 2)
    #[serde(default = "default_dead_band")]
    pub dead_band: u32,

    /// Speed bands, highest threshold first
    #[serde(default = "default_speed_bands")]
    pub speed_bands: Vec<SpeedBand>,

    /// Power used when the error is inside no band (default: 60)
    #[serde(default = "default_base_speed")]
    pub base_speed: i32,

    /// Maximum steering deflection either side (default: 100)
    #[serde(default = "default_hard_limit")]
    pub hard_limit: i32,
}

/// Propulsion speeds
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DriveConfig {
    /// Speed used for line following and probes (default: 75)
    #[serde(default = "default_max_speed")]
    pub max_speed: i32,

    /// Speed used while seeking during the obstacle maneuver (default: 60)
    #[serde(default = "default_seek_speed")]
    pub seek_speed: i32,
}

/// Finder tuning
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Forward probe duration in controller ticks (default: 30)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u32,

    /// Angular step while on the straight (default: 4)
    #[serde(default = "default_straight_bump")]
    pub straight_bump: i32,

    /// Angular step on curves and after the obstacle (default: 10)
    #[serde(default = "default_curve_bump")]
    pub curve_bump: i32,

    /// Step limit for finders, 0 = until the hard limit (default: 0)
    #[serde(default)]
    pub max_step: u32,

    /// Count a line found by the corrective reverse probe as success
    #[serde(default = "default_accept_reverse_hit")]
    pub accept_reverse_hit: bool,
}

/// Course stage tuning
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CourseConfig {
    /// Stage the navigator starts in (default: StraightTrack)
    #[serde(default = "default_start_stage")]
    pub start_stage: Stage,

    /// Drive distance under one turn direction that marks a real corner (default: 120)
    #[serde(default = "default_curvature_threshold")]
    pub curvature_threshold: i32,

    /// Deflection considered straight (default: 8)
    #[serde(default = "default_straight_band")]
    pub straight_band: i32,

    /// Deflection that confirms the vehicle is in the curve (default: 20)
    #[serde(default = "default_curve_band")]
    pub curve_band: i32,

    /// Probe duration covering one expected dash gap (default: 60)
    #[serde(default = "default_dash_timeout")]
    pub dash_timeout: u32,

    /// Consecutive search failures that end the dashed segment (default: 2)
    #[serde(default = "default_dash_failure_limit")]
    pub dash_failure_limit: u32,

    /// Straight drive used to bridge a long gap (default: 100)
    #[serde(default = "default_gap_bridge_timeout")]
    pub gap_bridge_timeout: u32,

    /// Probe duration after the obstacle (default: 60)
    #[serde(default = "default_resume_timeout")]
    pub resume_timeout: u32,

    /// Consecutive one-sided corrections needed to leave Resume (default: 3)
    #[serde(default = "default_stability_count")]
    pub stability_count: u32,
}

/// Fixed obstacle choreography
///
/// Angles are magnitudes; the side is taken from the course direction.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObstacleConfig {
    #[serde(default = "default_away_angle")]
    pub away_angle: i32,
    /// Drive counts covered leaving the line
    #[serde(default = "default_first_seek_distance")]
    pub first_seek_distance: i32,
    #[serde(default = "default_first_seek_timeout")]
    pub first_seek_timeout: u32,
    /// Drive counts covered alongside the obstacle
    #[serde(default = "default_second_seek_distance")]
    pub second_seek_distance: i32,
    #[serde(default = "default_second_seek_timeout")]
    pub second_seek_timeout: u32,
    #[serde(default = "default_arc_angle")]
    pub arc_angle: i32,
    /// 0 = seek until the line returns
    #[serde(default)]
    pub return_seek_timeout: u32,
    #[serde(default = "default_realign_angle")]
    pub realign_angle: i32,
    #[serde(default = "default_back_timeout")]
    pub back_timeout: u32,
    /// Drive counts to reverse into contact
    #[serde(default = "default_contact_distance")]
    pub contact_distance: i32,
    /// Give up reversing into contact after this many ticks
    #[serde(default = "default_contact_timeout")]
    pub contact_timeout: u32,
    #[serde(default = "default_corner_angle")]
    pub corner_angle: i32,
}

/// Telemetry reporting
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Report (and statistics epoch) period (default: 500ms)
    #[serde(default = "default_report_period")]
    pub report_period_ms: u64,
}

/// Logging configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Circular obstacle placed on the simulated course
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ObstacleSpec {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Simulated vehicle and course (lengths in cm, angles in degrees)
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Simulation step (default: 5ms)
    #[serde(default = "default_sim_step")]
    pub step_ms: u64,

    /// Line centre polyline
    #[serde(default = "default_course")]
    pub course: Vec<[f32; 2]>,

    /// Width of the line (default: 2.0cm)
    #[serde(default = "default_line_width")]
    pub line_width: f32,

    /// Distance between axles (default: 15cm)
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,

    /// Distance from rear axle to the light sensor (default: 18cm)
    #[serde(default = "default_sensor_offset")]
    pub sensor_offset: f32,

    /// Steering counter units per second at full power (default: 300)
    #[serde(default = "default_steer_rate")]
    pub steer_rate: f32,

    /// Wheel angle in degrees per steering counter unit (default: 0.3)
    #[serde(default = "default_steer_ratio")]
    pub steer_ratio: f32,

    /// Ground speed at full drive power (default: 30cm/s)
    #[serde(default = "default_max_ground_speed")]
    pub max_ground_speed: f32,

    /// Drive counter units per cm (default: 20)
    #[serde(default = "default_counts_per_cm")]
    pub counts_per_cm: f32,

    #[serde(default = "default_light_on_line")]
    pub light_on_line: i32,
    #[serde(default = "default_light_off_line")]
    pub light_off_line: i32,

    /// Light sensor noise stddev (default: 8)
    #[serde(default = "default_light_noise")]
    pub light_noise: f32,

    /// Range reported when nothing is in view (default: 255)
    #[serde(default = "default_max_range")]
    pub max_range: i32,

    /// 0 = random each run
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    #[serde(default = "default_obstacle")]
    pub obstacle: Option<ObstacleSpec>,
}

// Default value functions
fn default_sample_period() -> u64 {
    10
}
fn default_light_threshold() -> i32 {
    250
}
fn default_range_threshold() -> i32 {
    20
}
fn default_tick_period() -> u64 {
    10
}
fn default_dead_band() -> u32 {
    2
}
fn default_speed_bands() -> Vec<SpeedBand> {
    vec![
        SpeedBand {
            above: 30,
            speed: 80,
        },
        SpeedBand {
            above: 15,
            speed: 70,
        },
    ]
}
fn default_base_speed() -> i32 {
    60
}
fn default_hard_limit() -> i32 {
    100
}
fn default_max_speed() -> i32 {
    75
}
fn default_seek_speed() -> i32 {
    60
}
fn default_probe_timeout() -> u32 {
    30
}
fn default_straight_bump() -> i32 {
    4
}
fn default_curve_bump() -> i32 {
    10
}
fn default_accept_reverse_hit() -> bool {
    true
}
fn default_start_stage() -> Stage {
    Stage::StraightTrack
}
fn default_curvature_threshold() -> i32 {
    120
}
fn default_straight_band() -> i32 {
    8
}
fn default_curve_band() -> i32 {
    20
}
fn default_dash_timeout() -> u32 {
    60
}
fn default_dash_failure_limit() -> u32 {
    2
}
fn default_gap_bridge_timeout() -> u32 {
    100
}
fn default_resume_timeout() -> u32 {
    60
}
fn default_stability_count() -> u32 {
    3
}

// Obstacle choreography defaults (tuned for the reference box)
fn default_away_angle() -> i32 {
    60
}
fn default_first_seek_distance() -> i32 {
    160
}
fn default_first_seek_timeout() -> u32 {
    200
}
fn default_second_seek_distance() -> i32 {
    120
}
fn default_second_seek_timeout() -> u32 {
    150
}
fn default_arc_angle() -> i32 {
    35
}
fn default_realign_angle() -> i32 {
    40
}
fn default_back_timeout() -> u32 {
    80
}
fn default_contact_distance() -> i32 {
    90
}
fn default_contact_timeout() -> u32 {
    120
}
fn default_corner_angle() -> i32 {
    70
}

fn default_report_period() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

// Simulation defaults
fn default_sim_step() -> u64 {
    5
}
fn default_course() -> Vec<[f32; 2]> {
    vec![
        [0.0, 0.0],
        [250.0, 0.0],
        [320.0, 30.0],
        [360.0, 100.0],
        [360.0, 250.0],
    ]
}
fn default_line_width() -> f32 {
    2.0
}
fn default_obstacle() -> Option<ObstacleSpec> {
    None
}
fn default_wheel_base() -> f32 {
    15.0
}
fn default_sensor_offset() -> f32 {
    18.0
}
fn default_steer_rate() -> f32 {
    300.0
}
fn default_steer_ratio() -> f32 {
    0.3
}
fn default_max_ground_speed() -> f32 {
    30.0
}
fn default_counts_per_cm() -> f32 {
    20.0
}
fn default_light_on_line() -> i32 {
    200
}
fn default_light_off_line() -> i32 {
    500
}
fn default_light_noise() -> f32 {
    8.0
}
fn default_max_range() -> i32 {
    255
}
fn default_seed() -> u64 {
    42
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period(),
            light_threshold: default_light_threshold(),
            range_threshold: default_range_threshold(),
            start_on_touch: false,
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period(),
            dead_band: default_dead_band(),
            speed_bands: default_speed_bands(),
            base_speed: default_base_speed(),
            hard_limit: default_hard_limit(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            seek_speed: default_seek_speed(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            probe_timeout: default_probe_timeout(),
            straight_bump: default_straight_bump(),
            curve_bump: default_curve_bump(),
            max_step: 0,
            accept_reverse_hit: default_accept_reverse_hit(),
        }
    }
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            start_stage: default_start_stage(),
            curvature_threshold: default_curvature_threshold(),
            straight_band: default_straight_band(),
            curve_band: default_curve_band(),
            dash_timeout: default_dash_timeout(),
            dash_failure_limit: default_dash_failure_limit(),
            gap_bridge_timeout: default_gap_bridge_timeout(),
            resume_timeout: default_resume_timeout(),
            stability_count: default_stability_count(),
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            away_angle: default_away_angle(),
            first_seek_distance: default_first_seek_distance(),
            first_seek_timeout: default_first_seek_timeout(),
            second_seek_distance: default_second_seek_distance(),
            second_seek_timeout: default_second_seek_timeout(),
            arc_angle: default_arc_angle(),
            return_seek_timeout: 0,
            realign_angle: default_realign_angle(),
            back_timeout: default_back_timeout(),
            contact_distance: default_contact_distance(),
            contact_timeout: default_contact_timeout(),
            corner_angle: default_corner_angle(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            report_period_ms: default_report_period(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_ms: default_sim_step(),
            course: default_course(),
            line_width: default_line_width(),
            wheel_base: default_wheel_base(),
            sensor_offset: default_sensor_offset(),
            steer_rate: default_steer_rate(),
            steer_ratio: default_steer_ratio(),
            max_ground_speed: default_max_ground_speed(),
            counts_per_cm: default_counts_per_cm(),
            light_on_line: default_light_on_line(),
            light_off_line: default_light_off_line(),
            light_noise: default_light_noise(),
            max_range: default_max_range(),
            random_seed: default_seed(),
            obstacle: default_obstacle(),
        }
    }
}

impl SteeringConfig {
    /// Servo power for a position error of `magnitude`.
    ///
    /// Bands are checked in order; the first band whose threshold is exceeded
    /// wins, otherwise `base_speed` applies.
    pub fn servo_speed(&self, magnitude: u32) -> i32 {
        self.speed_bands
            .iter()
            .find(|band| magnitude > band.above)
            .map(|band| band.speed)
            .unwrap_or(self.base_speed)
    }

    /// Saturate an angle at the hard limit; the flag reports whether the
    /// limit was reached.
    pub fn clamp_angle(&self, angle: i32) -> (i32, bool) {
        if angle >= self.hard_limit {
            (self.hard_limit, true)
        } else if angle <= -self.hard_limit {
            (-self.hard_limit, true)
        } else {
            (angle, false)
        }
    }
}

impl VehicleConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let config: VehicleConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the control loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sensors.sample_period_ms == 0
            || self.steering.tick_period_ms == 0
            || self.telemetry.report_period_ms == 0
            || self.simulation.step_ms == 0
        {
            return Err(Error::InvalidParameter(
                "loop periods must be non-zero".to_string(),
            ));
        }
        if self.steering.hard_limit <= 0 {
            return Err(Error::InvalidParameter(format!(
                "steering.hard_limit must be positive, got {}",
                self.steering.hard_limit
            )));
        }
        if self
            .steering
            .speed_bands
            .windows(2)
            .any(|pair| pair[0].above <= pair[1].above)
        {
            return Err(Error::InvalidParameter(
                "steering.speed_bands must be ordered by decreasing threshold".to_string(),
            ));
        }
        if self.search.straight_bump <= 0 || self.search.curve_bump <= 0 {
            return Err(Error::InvalidParameter(
                "search bumps must be positive".to_string(),
            ));
        }
        if self.simulation.course.len() < 2 {
            return Err(Error::InvalidParameter(
                "simulation.course needs at least two points".to_string(),
            ));
        }
        Ok(())
    }
}
