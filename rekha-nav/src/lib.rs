//! RekhaNav - Line-following control core
//!
//! Samples a downward light sensor, a forward ranging sensor and the motor
//! counters, steers a servo to commanded angles, and runs a staged navigator
//! that re-acquires the line whenever it is lost.
//!
//! ## Multi-Threaded Architecture
//!
//! - **Sensor Thread**: samples all channels, detects line/obstacle edges
//! - **Control Thread**: steering servo, countdown timer, drive distance
//! - **Propulsion Thread**: start/stop of both drive motors
//! - **Navigation Thread**: stage state machine and search strategies
//! - **Telemetry Thread**: periodic status report
//!
//! Device access goes through [`VehicleIo`]; [`sim::SimulatedVehicle`]
//! provides a kinematic stand-in for hardware.

pub mod config;
pub mod control;
pub mod error;
pub mod hardware;
pub mod navigator;
pub mod sampler;
pub mod shared;
pub mod signal;
pub mod sim;
pub mod stats;
pub mod telemetry;
pub mod threads;
pub mod vector;

pub use config::VehicleConfig;
pub use error::{Error, Result};
pub use hardware::{DriveMotor, VehicleIo};
pub use navigator::{Navigator, RunOutcome, Stage};
pub use shared::SharedState;
pub use telemetry::TelemetryReport;
pub use vector::Direction;
