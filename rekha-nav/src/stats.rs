//! Running per-channel sensor statistics.
//!
//! The sampler records every sample; the telemetry reporter closes an epoch by
//! taking a summary, which resets the count but keeps the latest value.

use serde::Serialize;

/// Sensor channels tracked by the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Light,
    Range,
    SteerPosition,
    DrivePosition,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Light,
        Channel::Range,
        Channel::SteerPosition,
        Channel::DrivePosition,
    ];

    #[inline]
    fn index(self) -> usize {
        match self {
            Channel::Light => 0,
            Channel::Range => 1,
            Channel::SteerPosition => 2,
            Channel::DrivePosition => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Light => "light",
            Channel::Range => "range",
            Channel::SteerPosition => "steer",
            Channel::DrivePosition => "drive",
        }
    }
}

/// Running statistics for one channel.
///
/// `min`, `max` and `sum` are only meaningful while `count > 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorStat {
    pub current: i32,
    pub min: i32,
    pub max: i32,
    pub sum: i64,
    pub count: u32,
}

impl SensorStat {
    pub fn record(&mut self, value: i32) {
        self.current = value;
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.sum = value as i64;
            self.count = 1;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.sum += value as i64;
            self.count += 1;
        }
    }

    /// Integer mean of the epoch, if any sample was recorded.
    pub fn average(&self) -> Option<i32> {
        (self.count > 0).then(|| (self.sum / self.count as i64) as i32)
    }

    /// Close the epoch. `current` survives.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn summary(&self) -> ChannelSummary {
        let valid = self.count > 0;
        ChannelSummary {
            current: self.current,
            min: valid.then_some(self.min),
            max: valid.then_some(self.max),
            average: self.average(),
            samples: self.count,
        }
    }
}

/// Epoch view of one channel as exposed to telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub current: i32,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub average: Option<i32>,
    pub samples: u32,
}

/// One [`SensorStat`] per [`Channel`].
#[derive(Clone, Debug, Default)]
pub struct StatTracker {
    stats: [SensorStat; 4],
}

impl StatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&mut self, channel: Channel, value: i32) {
        self.stats[channel.index()].record(value);
    }

    pub fn get(&self, channel: Channel) -> &SensorStat {
        &self.stats[channel.index()]
    }

    pub fn current(&self, channel: Channel) -> i32 {
        self.stats[channel.index()].current
    }

    /// Summaries of every channel, then reset all counts.
    pub fn take_epoch(&mut self) -> [(Channel, ChannelSummary); 4] {
        Channel::ALL.map(|channel| {
            let stat = &mut self.stats[channel.index()];
            let summary = stat.summary();
            stat.reset();
            (channel, summary)
        })
    }
}
