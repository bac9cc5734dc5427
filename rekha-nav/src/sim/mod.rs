//! Simulated vehicle for hardware-free runs.
//!
//! A background loop integrates the kinematics every `step_ms` and refreshes
//! the sensor readings; [`VehicleIo`] reads return the latest refresh and
//! motor writes take effect on the next step.
//!
//! | Device | Simulation |
//! |--------|------------|
//! | Light sensor | Distance from sensor point to the course polyline, plus noise |
//! | Ranging sensor | Ray cast against the circular obstacle |
//! | Steering motor | Counter integrating power × `steer_rate` |
//! | Drive motors | Bicycle kinematics, counter from distance travelled |
//! | Touch sensor | [`SimulatedVehicle::press_touch`] |

mod geometry;
mod noise;
mod physics;

pub use geometry::Course;
pub use physics::VehiclePhysics;

use noise::NoiseGenerator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::hardware::{DriveMotor, VehicleIo};

/// Latest simulated readings.
#[derive(Clone, Copy, Debug)]
struct Readings {
    light: i32,
    range: i32,
    steer_position: i32,
    drive_position: i32,
}

struct SimState {
    physics: VehiclePhysics,
    readings: Readings,
    noise: NoiseGenerator,
}

impl SimState {
    fn refresh(&mut self, course: &Course, config: &SimulationConfig) {
        let light = if self.physics.over_line(course, config) {
            config.light_on_line
        } else {
            config.light_off_line
        };
        self.readings = Readings {
            light: self.noise.perturb(light, config.light_noise),
            range: self.physics.range(config),
            steer_position: self.physics.steer_position(),
            drive_position: self.physics.drive_position(),
        };
    }
}

/// [`VehicleIo`] backed by a kinematic simulation.
pub struct SimulatedVehicle {
    state: Arc<Mutex<SimState>>,
    touch: AtomicBool,
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedVehicle {
    /// Place the vehicle on the course and start the simulation loop.
    pub fn start(config: SimulationConfig) -> Result<Self> {
        if config.course.len() < 2 {
            return Err(Error::Config(
                "Simulated course needs at least two points".to_string(),
            ));
        }

        let course = Course::new(config.course.clone());
        let mut state = SimState {
            physics: VehiclePhysics::on_course(&course, &config),
            readings: Readings {
                light: 0,
                range: 0,
                steer_position: 0,
                drive_position: 0,
            },
            noise: NoiseGenerator::new(config.random_seed),
        };
        state.refresh(&course, &config);

        let state = Arc::new(Mutex::new(state));
        let shutdown = Arc::new(AtomicBool::new(false));

        let loop_state = Arc::clone(&state);
        let loop_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("vehicle-sim".to_string())
            .spawn(move || simulation_loop(config, course, loop_state, loop_shutdown))?;

        log::info!("Simulated vehicle started");
        Ok(Self {
            state,
            touch: AtomicBool::new(false),
            shutdown,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Hold or release the touch sensor.
    pub fn press_touch(&self, pressed: bool) {
        self.touch.store(pressed, Ordering::Relaxed);
    }

    /// Rear axle pose (cm, cm, radians).
    pub fn pose(&self) -> (f32, f32, f32) {
        self.state.lock().physics.pose()
    }

    /// Stop the simulation loop and wait for it.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimulatedVehicle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl VehicleIo for SimulatedVehicle {
    fn read_light(&self) -> i32 {
        self.state.lock().readings.light
    }

    fn read_range(&self) -> i32 {
        self.state.lock().readings.range
    }

    fn read_steer_position(&self) -> i32 {
        self.state.lock().readings.steer_position
    }

    fn read_drive_position(&self) -> i32 {
        self.state.lock().readings.drive_position
    }

    fn read_touch(&self) -> bool {
        self.touch.load(Ordering::Relaxed)
    }

    fn set_drive_power(&self, motor: DriveMotor, power: i32, _brake: bool) {
        // Both wheels share one drive train in the model
        if motor == DriveMotor::Left {
            self.state.lock().physics.set_drive_power(power);
        }
    }

    fn set_steer_power(&self, power: i32) {
        self.state.lock().physics.set_steer_power(power);
    }
}

fn simulation_loop(
    config: SimulationConfig,
    course: Course,
    state: Arc<Mutex<SimState>>,
    shutdown: Arc<AtomicBool>,
) {
    let interval = Duration::from_millis(config.step_ms);
    let mut last_time = Instant::now();
    let mut was_blocked = false;

    log::info!("Simulation loop started: step={:?}", interval);

    while !shutdown.load(Ordering::Relaxed) {
        let loop_start = Instant::now();
        let dt = loop_start.duration_since(last_time).as_secs_f32();
        last_time = loop_start;

        {
            let mut state = state.lock();
            let blocked = state.physics.update(dt, &config);
            if blocked && !was_blocked {
                let (x, y, _) = state.physics.pose();
                log::info!("Simulated vehicle blocked by obstacle at ({:.1}, {:.1})", x, y);
            }
            was_blocked = blocked;
            state.refresh(&course, &config);
        }

        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::info!("Simulation loop stopped");
}
