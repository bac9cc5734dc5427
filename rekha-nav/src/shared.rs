//! Shared state for the control loops.
//!
//! Provides the state exchanged between:
//! - Sensor thread (samples, line/obstacle flags, edge snapshots)
//! - Control and propulsion threads (completion signals)
//! - Navigation thread (stage, debug marker, published motion target)
//! - Telemetry thread (epoch statistics, read-only view of the rest)
//!
//! Every field has exactly one writer role.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::navigator::Stage;
use crate::signal::{EventFlags, SignalSet};
use crate::stats::{Channel, ChannelSummary, StatTracker};

/// Motion command last published by the navigator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotionTarget {
    /// Signed speed × direction applied to both drive motors
    pub velocity: i32,
    /// Steering angle the servo is driving toward
    pub steer_target: i32,
    /// Absolute drive position that ends the current drive, if armed
    pub drive_target: Option<i32>,
    /// Countdown ticks that end the current drive, if armed
    pub countdown: Option<u32>,
}

/// Shared state between all control loops.
#[derive(Debug)]
pub struct SharedState {
    /// Light sensor is over the line (written by sensor thread)
    on_line: AtomicBool,

    /// Obstacle within range threshold (written by sensor thread)
    obstacle: AtomicBool,

    /// Drive position at the most recent line edge (written by sensor thread)
    line_edge_position: AtomicI32,

    /// Per-channel statistics (sensor thread records, telemetry closes epochs)
    stats: Mutex<StatTracker>,

    /// Last published motion target (written by navigation thread)
    motion: Mutex<MotionTarget>,

    /// Current course stage (written by navigation thread)
    stage: Mutex<Stage>,

    /// Free-form debug value; zeroed when a run fails
    debug: AtomicI32,

    /// Notifications consumed by the navigator
    pub navigator_events: EventFlags,

    /// Generation of the last drive the controller completed
    finished_drive: AtomicU32,

    /// Shutdown signal for graceful termination
    shutdown: AtomicBool,
}

impl SharedState {
    pub fn new(initial_stage: Stage) -> Self {
        Self {
            on_line: AtomicBool::new(false),
            obstacle: AtomicBool::new(false),
            line_edge_position: AtomicI32::new(0),
            stats: Mutex::new(StatTracker::new()),
            motion: Mutex::new(MotionTarget::default()),
            stage: Mutex::new(initial_stage),
            debug: AtomicI32::new(0),
            navigator_events: EventFlags::new(),
            finished_drive: AtomicU32::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn on_line(&self) -> bool {
        self.on_line.load(Ordering::Acquire)
    }

    pub fn set_on_line(&self, on_line: bool) {
        self.on_line.store(on_line, Ordering::Release);
    }

    pub fn obstacle(&self) -> bool {
        self.obstacle.load(Ordering::Acquire)
    }

    pub fn set_obstacle(&self, obstacle: bool) {
        self.obstacle.store(obstacle, Ordering::Release);
    }

    pub fn line_edge_position(&self) -> i32 {
        self.line_edge_position.load(Ordering::Acquire)
    }

    pub fn set_line_edge_position(&self, position: i32) {
        self.line_edge_position.store(position, Ordering::Release);
    }

    /// Record one sample into the channel statistics.
    pub fn record(&self, channel: Channel, value: i32) {
        self.stats.lock().record(channel, value);
    }

    /// Most recent sample of a channel.
    pub fn current(&self, channel: Channel) -> i32 {
        self.stats.lock().current(channel)
    }

    /// Close the statistics epoch.
    pub fn take_epoch(&self) -> [(Channel, ChannelSummary); 4] {
        self.stats.lock().take_epoch()
    }

    pub fn motion(&self) -> MotionTarget {
        *self.motion.lock()
    }

    /// Apply an update to the published motion target.
    pub fn update_motion(&self, update: impl FnOnce(&mut MotionTarget)) -> MotionTarget {
        let mut motion = self.motion.lock();
        update(&mut motion);
        *motion
    }

    pub fn stage(&self) -> Stage {
        *self.stage.lock()
    }

    pub fn set_stage(&self, stage: Stage) {
        *self.stage.lock() = stage;
    }

    pub fn debug(&self) -> i32 {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, value: i32) {
        self.debug.store(value, Ordering::Relaxed);
    }

    /// Record drive `generation` as complete, then raise `DRIVE_DONE`.
    pub fn finish_drive(&self, generation: u32) {
        self.finished_drive.store(generation, Ordering::Release);
        self.navigator_events.raise(SignalSet::DRIVE_DONE);
    }

    pub fn finished_drive(&self) -> u32 {
        self.finished_drive.load(Ordering::Acquire)
    }

    /// Signal shutdown and release a blocked navigator.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.navigator_events.close();
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(Stage::StraightTrack)
    }
}
