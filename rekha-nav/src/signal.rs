//! Level-set, edge-cleared notifications.
//!
//! A producer raises bits in a consumer's [`EventFlags`]; the consumer blocks
//! until any bit of a mask is set and clears the bits it has handled. A bit
//! raised before the wait starts is still observed, and repeated raises before
//! a wait collapse into one.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Bit mask of named signals.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalSet(u16);

impl SignalSet {
    pub const EMPTY: SignalSet = SignalSet(0);
    /// Line presence changed (sampler → navigator)
    pub const LINE_UPDATE: SignalSet = SignalSet(1 << 0);
    /// Obstacle appeared (sampler → navigator)
    pub const OBSTACLE: SignalSet = SignalSet(1 << 1);
    /// Steering reached its target (controller → navigator)
    pub const STEER_DONE: SignalSet = SignalSet(1 << 2);
    /// Countdown or drive distance expired (controller → navigator)
    pub const DRIVE_DONE: SignalSet = SignalSet(1 << 3);
    /// Operator start request (sampler → navigator)
    pub const START: SignalSet = SignalSet(1 << 4);

    const NAMES: [(SignalSet, &'static str); 5] = [
        (SignalSet::LINE_UPDATE, "LINE_UPDATE"),
        (SignalSet::OBSTACLE, "OBSTACLE"),
        (SignalSet::STEER_DONE, "STEER_DONE"),
        (SignalSet::DRIVE_DONE, "DRIVE_DONE"),
        (SignalSet::START, "START"),
    ];

    #[inline]
    pub fn contains(self, other: SignalSet) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SignalSet {
    type Output = SignalSet;
    fn bitor(self, rhs: SignalSet) -> SignalSet {
        SignalSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for SignalSet {
    fn bitor_assign(&mut self, rhs: SignalSet) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SignalSet {
    type Output = SignalSet;
    fn bitand(self, rhs: SignalSet) -> SignalSet {
        SignalSet(self.0 & rhs.0)
    }
}

impl Not for SignalSet {
    type Output = SignalSet;
    fn not(self) -> SignalSet {
        SignalSet(!self.0)
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "SignalSet({})", names.join(" | "))
    }
}

#[derive(Debug, Default)]
struct FlagState {
    raised: SignalSet,
    closed: bool,
}

/// Event flags owned by one consumer loop.
#[derive(Debug, Default)]
pub struct EventFlags {
    state: Mutex<FlagState>,
    cond: Condvar,
}

impl EventFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bits and wake the consumer.
    pub fn raise(&self, signals: SignalSet) {
        let mut state = self.state.lock();
        state.raised |= signals;
        self.cond.notify_all();
    }

    /// Clear bits the consumer has handled.
    pub fn clear(&self, signals: SignalSet) {
        let mut state = self.state.lock();
        state.raised = state.raised & !signals;
    }

    /// Currently raised bits within `mask`, without clearing.
    pub fn peek(&self, mask: SignalSet) -> SignalSet {
        self.state.lock().raised & mask
    }

    /// Fetch and clear raised bits within `mask` without blocking.
    pub fn take(&self, mask: SignalSet) -> SignalSet {
        let mut state = self.state.lock();
        let got = state.raised & mask;
        state.raised = state.raised & !got;
        got
    }

    /// Block until any bit of `mask` is raised. Bits are returned, not cleared.
    pub fn wait_any(&self, mask: SignalSet) -> Result<SignalSet> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::Shutdown);
            }
            let got = state.raised & mask;
            if !got.is_empty() {
                return Ok(got);
            }
            self.cond.wait(&mut state);
        }
    }

    /// Like [`wait_any`](Self::wait_any), giving up after `timeout`.
    pub fn wait_any_timeout(&self, mask: SignalSet, timeout: Duration) -> Result<Option<SignalSet>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::Shutdown);
            }
            let got = state.raised & mask;
            if !got.is_empty() {
                return Ok(Some(got));
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                let got = state.raised & mask;
                return Ok((!got.is_empty()).then_some(got));
            }
        }
    }

    /// Wake every waiter with [`Error::Shutdown`]; later waits fail immediately.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cond.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
