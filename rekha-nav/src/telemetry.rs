//! Periodic telemetry report.
//!
//! Capturing a report closes the statistics epoch, so the report period is
//! also the averaging window of the per-channel summaries.

use serde::Serialize;
use std::fmt;

use crate::navigator::Stage;
use crate::shared::SharedState;
use crate::stats::{Channel, ChannelSummary};

/// Snapshot of everything an observer of the vehicle can see.
#[derive(Clone, Debug, Serialize)]
pub struct TelemetryReport {
    pub stage: Stage,
    /// Last debug marker; zero after a failed run
    pub debug: i32,
    pub on_line: bool,
    pub obstacle: bool,
    pub velocity: i32,
    pub steer_target: i32,
    pub channels: [(Channel, ChannelSummary); 4],
}

impl TelemetryReport {
    /// Read the shared state and close the statistics epoch.
    pub fn capture(shared: &SharedState) -> Self {
        let motion = shared.motion();
        Self {
            stage: shared.stage(),
            debug: shared.debug(),
            on_line: shared.on_line(),
            obstacle: shared.obstacle(),
            velocity: motion.velocity,
            steer_target: motion.steer_target,
            channels: shared.take_epoch(),
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelSummary> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, summary)| summary)
    }
}

fn fmt_opt(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage={} debug={} line={} obstacle={} vel={} steer->{}",
            self.stage,
            self.debug,
            if self.on_line { "on" } else { "off" },
            if self.obstacle { "yes" } else { "no" },
            self.velocity,
            self.steer_target
        )?;
        for (channel, summary) in &self.channels {
            write!(
                f,
                " | {} {} [{}..{}] avg {}",
                channel.name(),
                summary.current,
                fmt_opt(summary.min),
                fmt_opt(summary.max),
                fmt_opt(summary.average)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_closes_epoch() {
        let shared = SharedState::default();
        shared.record(Channel::Light, 200);
        shared.record(Channel::Light, 400);
        shared.set_debug(7);

        let report = TelemetryReport::capture(&shared);
        assert_eq!(report.channel(Channel::Light).unwrap().average, Some(300));
        assert_eq!(report.debug, 7);

        let next = TelemetryReport::capture(&shared);
        assert_eq!(next.channel(Channel::Light).unwrap().samples, 0);
        assert_eq!(next.channel(Channel::Light).unwrap().current, 400);
    }

    #[test]
    fn test_display_line() {
        let shared = SharedState::default();
        shared.record(Channel::Range, 42);
        shared.update_motion(|m| m.velocity = 75);

        let line = TelemetryReport::capture(&shared).to_string();
        assert!(line.starts_with("stage=StraightTrack debug=0 line=off"));
        assert!(line.contains("vel=75"));
        assert!(line.contains("range 42 [42..42] avg 42"));
        assert!(line.contains("light 0 [-..-] avg -"));
    }
}
