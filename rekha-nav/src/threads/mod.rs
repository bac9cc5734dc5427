//! Multi-threaded architecture for RekhaNav.
//!
//! One thread per concern:
//! - Sensor thread: samples the four sensors, detects edges, raises events
//! - Control thread: steering servo, countdown and drive distance
//! - Propulsion thread: start/stop of both drive motors
//! - Navigation thread: the staged course state machine
//! - Telemetry thread: periodic status report
//!
//! The navigator owns the only senders of both command channels. When it
//! returns, the controller threads drain, stop their motors and exit.

mod control;
mod navigation;
mod propulsion;
mod sensor;
mod telemetry;

pub use control::ControlThread;
pub use navigation::NavigationThread;
pub use propulsion::PropulsionThread;
pub use sensor::SensorThread;
pub use telemetry::TelemetryThread;

use crossbeam_channel::unbounded;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::VehicleConfig;
use crate::control::{ControlRequest, PropulsionCommand};
use crate::error::Result;
use crate::hardware::VehicleIo;
use crate::navigator::{RunOutcome, SignalLink};
use crate::shared::SharedState;

/// Thread handles for the multi-threaded system.
pub struct ThreadHandles {
    pub sensor: JoinHandle<()>,
    pub control: JoinHandle<()>,
    pub propulsion: JoinHandle<()>,
    pub telemetry: JoinHandle<()>,
    pub navigation: JoinHandle<Result<RunOutcome>>,
}

/// Spawn all threads and return handles.
pub fn spawn_threads(
    config: VehicleConfig,
    shared_state: Arc<SharedState>,
    io: Arc<dyn VehicleIo>,
) -> Result<ThreadHandles> {
    let (propulsion_tx, propulsion_rx) = unbounded::<PropulsionCommand>();
    let (control_tx, control_rx) = unbounded::<ControlRequest>();

    // Sensor thread first so line state is known before the navigator looks
    let sensor_config = config.sensors.clone();
    let sensor_io = Arc::clone(&io);
    let sensor_state = Arc::clone(&shared_state);
    let sensor = thread::Builder::new()
        .name("sensor".into())
        .spawn(move || SensorThread::new(sensor_config, sensor_io, sensor_state).run())?;

    let steering_config = config.steering.clone();
    let control_io = Arc::clone(&io);
    let control_state = Arc::clone(&shared_state);
    let control = thread::Builder::new().name("control".into()).spawn(move || {
        ControlThread::new(steering_config, control_io, control_state, control_rx).run()
    })?;

    let propulsion_io = Arc::clone(&io);
    let propulsion_state = Arc::clone(&shared_state);
    let propulsion = thread::Builder::new()
        .name("propulsion".into())
        .spawn(move || {
            PropulsionThread::new(propulsion_io, propulsion_state, propulsion_rx).run()
        })?;

    let telemetry_state = Arc::clone(&shared_state);
    let mut telemetry_thread = TelemetryThread::new(&config.telemetry, telemetry_state);
    let telemetry = thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || telemetry_thread.run())?;

    let link = SignalLink::new(Arc::clone(&shared_state), propulsion_tx, control_tx);
    let navigation_thread = NavigationThread::new(config, shared_state, link);
    let navigation = thread::Builder::new()
        .name("navigation".into())
        .spawn(move || navigation_thread.run())?;

    Ok(ThreadHandles {
        sensor,
        control,
        propulsion,
        telemetry,
        navigation,
    })
}
