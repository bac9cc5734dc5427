//! Telemetry thread: one report per period, logged at info level.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::TelemetryConfig;
use crate::shared::SharedState;
use crate::telemetry::TelemetryReport;

/// Telemetry thread state and logic.
pub struct TelemetryThread {
    shared_state: Arc<SharedState>,
    period: Duration,
}

impl TelemetryThread {
    pub fn new(config: &TelemetryConfig, shared_state: Arc<SharedState>) -> Self {
        Self {
            shared_state,
            period: Duration::from_millis(config.report_period_ms),
        }
    }

    /// Run the telemetry thread main loop.
    pub fn run(&mut self) {
        log::info!("Telemetry thread started ({:?} period)", self.period);

        let poll = self.period.min(Duration::from_millis(50));
        let mut next_report = Instant::now() + self.period;

        while !self.shared_state.should_shutdown() {
            std::thread::sleep(poll);
            if Instant::now() >= next_report {
                next_report += self.period;
                let report = TelemetryReport::capture(&self.shared_state);
                log::info!("{}", report);
            }
        }

        log::info!("Telemetry thread shutting down");
    }
}
