//! RekhaNav - Line-following controller
//!
//! Runs the control core against the simulated vehicle: spawns every control
//! loop, waits for the navigator to finish and reports how the run ended.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rekha_nav::error::{Error, Result};
use rekha_nav::sim::SimulatedVehicle;
use rekha_nav::threads::spawn_threads;
use rekha_nav::{RunOutcome, SharedState, Stage, VehicleConfig, VehicleIo};

const DEFAULT_CONFIG: &str = "rekha.toml";

/// Line-following controller on a simulated vehicle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to rekha.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stage to start in (e.g. StraightTrack, DashedTrack, Resume)
    #[arg(short, long)]
    start_stage: Option<Stage>,

    /// Telemetry report period in milliseconds
    #[arg(long)]
    report_period_ms: Option<u64>,
}

fn load_config(args: &Args) -> Result<VehicleConfig> {
    let mut config = match &args.config {
        Some(path) => VehicleConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            VehicleConfig::load(Path::new(DEFAULT_CONFIG))?
        }
        None => VehicleConfig::default(),
    };

    if let Some(stage) = args.start_stage {
        config.course.start_stage = stage;
    }
    if let Some(period) = args.report_period_ms {
        config.telemetry.report_period_ms = period;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("RekhaNav v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => log::info!("Using config: {}", path.display()),
        None if Path::new(DEFAULT_CONFIG).exists() => log::info!("Using config: {}", DEFAULT_CONFIG),
        None => log::info!("Using default configuration"),
    }
    log::info!(
        "Start stage {}, sampling every {} ms, control tick {} ms",
        config.course.start_stage,
        config.sensors.sample_period_ms,
        config.steering.tick_period_ms
    );

    let shared_state = Arc::new(SharedState::new(config.course.start_stage));

    let state = Arc::clone(&shared_state);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        state.signal_shutdown();
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let vehicle = Arc::new(SimulatedVehicle::start(config.simulation.clone())?);
    let start_on_touch = config.sensors.start_on_touch;
    let io: Arc<dyn VehicleIo> = Arc::clone(&vehicle) as Arc<dyn VehicleIo>;
    let handles = spawn_threads(config, Arc::clone(&shared_state), io)?;

    if start_on_touch {
        // No operator in simulation: press and release once
        std::thread::sleep(Duration::from_millis(500));
        log::info!("Pressing simulated start button");
        vehicle.press_touch(true);
        std::thread::sleep(Duration::from_millis(100));
        vehicle.press_touch(false);
    }

    let outcome = handles
        .navigation
        .join()
        .map_err(|_| Error::Other("Navigation thread panicked".to_string()))?;

    match outcome {
        Ok(RunOutcome::LineLost { stage }) => {
            let (x, y, heading) = vehicle.pose();
            log::error!(
                "Line lost in {} at ({:.1}, {:.1}) heading {:.2} rad",
                stage,
                x,
                y,
                heading
            );
            log::info!("Telemetry continues. Press Ctrl-C to stop.");
            while !shared_state.should_shutdown() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }
        Ok(RunOutcome::Stopped { stage }) => log::info!("Stopped in {}", stage),
        Err(ref e) => log::error!("Navigator failed: {}", e),
    }

    shared_state.signal_shutdown();
    log::info!("Waiting for threads to finish...");

    for (name, handle) in [
        ("Sensor", handles.sensor),
        ("Control", handles.control),
        ("Propulsion", handles.propulsion),
        ("Telemetry", handles.telemetry),
    ] {
        if let Err(e) = handle.join() {
            log::error!("{} thread panicked: {:?}", name, e);
        }
    }
    vehicle.shutdown();

    log::info!("RekhaNav finished");
    outcome.map(|_| ())
}
