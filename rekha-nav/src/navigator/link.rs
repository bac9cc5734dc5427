//! Primitive motion operations.
//!
//! [`Actuation`] is the navigator's view of the vehicle. [`SignalLink`] is the
//! threaded implementation: commands go to the controllers over channels,
//! completions and sensor edges come back as [`EventFlags`] bits.
//!
//! [`EventFlags`]: crate::signal::EventFlags

use crossbeam_channel::Sender;
use std::sync::Arc;

use crate::control::{ControlRequest, PropulsionCommand};
use crate::error::{Error, Result};
use crate::shared::SharedState;
use crate::signal::SignalSet;
use crate::stats::Channel;
use crate::vector::Direction;

/// Blocking motion primitives used by the navigator.
///
/// Timeouts are countdown ticks of the position/timer controller; `0` means
/// unbounded. Only one primitive is ever in flight.
pub trait Actuation {
    /// Drive until the line is lost or the countdown expires.
    ///
    /// Returns `true` if the line was lost; returns `true` at once, without
    /// driving, when the line is already lost.
    fn drive_while_on_line(&mut self, speed: i32, direction: Direction, timeout: u32)
    -> Result<bool>;

    /// Drive until the line is found or the countdown expires.
    ///
    /// Returns `true` if the line was found; returns `true` at once, without
    /// driving, when already on the line.
    fn drive_until_line_found(
        &mut self,
        speed: i32,
        direction: Direction,
        timeout: u32,
    ) -> Result<bool>;

    /// Drive blind until the drive position moved by `distance` counts or
    /// `timeout` expires, whichever comes first.
    fn drive_distance(
        &mut self,
        speed: i32,
        direction: Direction,
        distance: i32,
        timeout: u32,
    ) -> Result<()>;

    /// Stop propulsion, servo the steering to `angle` and wait for it.
    fn steer_to(&mut self, angle: i32) -> Result<()>;

    /// Stop propulsion and disarm drive timers.
    fn stop(&mut self) -> Result<()>;

    fn on_line(&self) -> bool;

    fn obstacle(&self) -> bool;

    /// Latest drive position counter.
    fn drive_position(&self) -> i32;

    /// Drive position at the most recent line edge.
    fn line_edge_position(&self) -> i32;

    /// While armed, an obstacle appearing also ends a drive.
    fn set_obstacle_watch(&mut self, armed: bool);

    /// Block until the operator start request.
    fn wait_for_start(&mut self) -> Result<()>;
}

/// What ends a drive besides the controller's `DRIVE_DONE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Until {
    /// Line presence becomes this value
    OnLine(bool),
    /// Only `DRIVE_DONE`
    Done,
}

/// [`Actuation`] over the controller channels and the navigator's event flags.
pub struct SignalLink {
    shared: Arc<SharedState>,
    propulsion_tx: Sender<PropulsionCommand>,
    control_tx: Sender<ControlRequest>,
    obstacle_watch: bool,
    /// Generation of the drive in flight; completions of older drives are stale
    generation: u32,
}

impl SignalLink {
    pub fn new(
        shared: Arc<SharedState>,
        propulsion_tx: Sender<PropulsionCommand>,
        control_tx: Sender<ControlRequest>,
    ) -> Self {
        Self {
            shared,
            propulsion_tx,
            control_tx,
            obstacle_watch: false,
            generation: 0,
        }
    }

    fn propulsion(&self, command: PropulsionCommand) -> Result<()> {
        self.propulsion_tx
            .send(command)
            .map_err(|_| Error::ChannelClosed("propulsion"))
    }

    fn control(&self, request: ControlRequest) -> Result<()> {
        self.control_tx
            .send(request)
            .map_err(|_| Error::ChannelClosed("position"))
    }

    fn halt(&self) -> Result<()> {
        self.shared.update_motion(|m| {
            m.velocity = 0;
            m.countdown = None;
            m.drive_target = None;
        });
        self.control(ControlRequest::Cancel)?;
        self.propulsion(PropulsionCommand::Stop)
    }

    /// Common body of every drive primitive. Returns `true` when the `until`
    /// line condition was met.
    fn drive(
        &mut self,
        speed: i32,
        direction: Direction,
        timeout: u32,
        distance: Option<i32>,
        until: Until,
    ) -> Result<bool> {
        let events = &self.shared.navigator_events;
        events.clear(SignalSet::LINE_UPDATE | SignalSet::DRIVE_DONE | SignalSet::OBSTACLE);

        if let Until::OnLine(wanted) = until
            && self.shared.on_line() == wanted
        {
            return Ok(true);
        }
        if self.obstacle_watch && self.shared.obstacle() {
            log::debug!("SignalLink: obstacle present, not driving");
            return Ok(false);
        }

        let velocity = direction * speed;
        let drive_target = distance.map(|d| self.drive_position().saturating_add(d));
        self.shared.update_motion(|m| {
            m.velocity = velocity;
            m.countdown = (timeout > 0).then_some(timeout);
            m.drive_target = drive_target;
        });
        log::debug!(
            "SignalLink: drive velocity={} timeout={} distance={:?} until={:?}",
            velocity,
            timeout,
            distance,
            until
        );

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.control(ControlRequest::Countdown {
            ticks: timeout,
            generation,
        })?;
        if let Some(distance) = distance {
            self.control(ControlRequest::DriveDistance {
                distance,
                generation,
            })?;
        }
        self.propulsion(PropulsionCommand::Start { velocity })?;

        let mut mask = SignalSet::DRIVE_DONE;
        if matches!(until, Until::OnLine(_)) {
            mask |= SignalSet::LINE_UPDATE;
        }
        if self.obstacle_watch {
            mask |= SignalSet::OBSTACLE;
        }

        let met = loop {
            let got = events.wait_any(mask)?;
            if got.contains(SignalSet::LINE_UPDATE) {
                events.clear(SignalSet::LINE_UPDATE);
                if let Until::OnLine(wanted) = until
                    && self.shared.on_line() == wanted
                {
                    break true;
                }
            }
            if got.contains(SignalSet::DRIVE_DONE) {
                // The generation is stored before the raise, so clearing first
                // cannot drop a completion of this drive
                events.clear(SignalSet::DRIVE_DONE);
                if self.shared.finished_drive() == generation {
                    break false;
                }
                log::debug!("SignalLink: ignoring completion of an earlier drive");
            }
            if got.contains(SignalSet::OBSTACLE) {
                log::debug!("SignalLink: obstacle ended drive");
                break false;
            }
        };

        self.halt()?;
        events.clear(SignalSet::DRIVE_DONE);
        Ok(met)
    }
}

impl Actuation for SignalLink {
    fn drive_while_on_line(
        &mut self,
        speed: i32,
        direction: Direction,
        timeout: u32,
    ) -> Result<bool> {
        self.drive(speed, direction, timeout, None, Until::OnLine(false))
    }

    fn drive_until_line_found(
        &mut self,
        speed: i32,
        direction: Direction,
        timeout: u32,
    ) -> Result<bool> {
        self.drive(speed, direction, timeout, None, Until::OnLine(true))
    }

    fn drive_distance(
        &mut self,
        speed: i32,
        direction: Direction,
        distance: i32,
        timeout: u32,
    ) -> Result<()> {
        let signed = direction * distance.abs();
        self.drive(speed, direction, timeout, Some(signed), Until::Done)
            .map(|_| ())
    }

    fn steer_to(&mut self, angle: i32) -> Result<()> {
        self.halt()?;

        let events = &self.shared.navigator_events;
        events.clear(SignalSet::STEER_DONE);
        self.shared.update_motion(|m| m.steer_target = angle);
        log::debug!("SignalLink: steer to {}", angle);
        self.control(ControlRequest::Steer { target: angle })?;

        events.wait_any(SignalSet::STEER_DONE)?;
        events.clear(SignalSet::STEER_DONE);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.halt()
    }

    fn on_line(&self) -> bool {
        self.shared.on_line()
    }

    fn obstacle(&self) -> bool {
        self.shared.obstacle()
    }

    fn drive_position(&self) -> i32 {
        self.shared.current(Channel::DrivePosition)
    }

    fn line_edge_position(&self) -> i32 {
        self.shared.line_edge_position()
    }

    fn set_obstacle_watch(&mut self, armed: bool) {
        self.obstacle_watch = armed;
    }

    fn wait_for_start(&mut self) -> Result<()> {
        let events = &self.shared.navigator_events;
        events.wait_any(SignalSet::START)?;
        events.clear(SignalSet::START);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, unbounded};
    use std::thread;
    use std::time::Duration;

    fn link() -> (
        SignalLink,
        Arc<SharedState>,
        Receiver<PropulsionCommand>,
        Receiver<ControlRequest>,
    ) {
        let shared = Arc::new(SharedState::default());
        let (propulsion_tx, propulsion_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        let link = SignalLink::new(Arc::clone(&shared), propulsion_tx, control_tx);
        (link, shared, propulsion_rx, control_rx)
    }

    #[test]
    fn test_already_lost_returns_without_driving() {
        let (mut link, _, propulsion_rx, control_rx) = link();

        assert!(link.drive_while_on_line(75, Direction::FORWARD, 0).unwrap());
        assert!(propulsion_rx.try_recv().is_err());
        assert!(control_rx.try_recv().is_err());
    }

    #[test]
    fn test_countdown_expiry_reports_not_found() {
        let (mut link, shared, propulsion_rx, control_rx) = link();
        shared.navigator_events.raise(SignalSet::DRIVE_DONE);

        // Stale completion: cleared when the drive starts
        let helper = {
            let shared = Arc::clone(&shared);
            let control_rx = control_rx.clone();
            thread::spawn(move || {
                let request = control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                assert_eq!(
                    request,
                    ControlRequest::Countdown {
                        ticks: 5,
                        generation: 1
                    }
                );
                shared.finish_drive(1);
            })
        };

        let found = link
            .drive_until_line_found(60, Direction::REVERSE, 5)
            .unwrap();
        helper.join().unwrap();

        assert!(!found);
        assert_eq!(
            propulsion_rx.try_recv().unwrap(),
            PropulsionCommand::Start { velocity: -60 }
        );
        assert_eq!(propulsion_rx.try_recv().unwrap(), PropulsionCommand::Stop);
        assert_eq!(control_rx.try_recv().unwrap(), ControlRequest::Cancel);
        assert_eq!(shared.motion().velocity, 0);
    }

    #[test]
    fn test_late_completion_of_previous_drive_is_ignored() {
        let (mut link, shared, _propulsion_rx, control_rx) = link();

        let helper = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for expected in 1..=2 {
                    let request = control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                    let ControlRequest::Countdown { generation, .. } = request else {
                        panic!("expected a countdown, got {:?}", request);
                    };
                    assert_eq!(generation, expected);
                    if generation == 1 {
                        shared.finish_drive(1);
                    } else {
                        // The first drive's countdown fires after the second drive armed
                        shared.finish_drive(1);
                        thread::sleep(Duration::from_millis(20));
                        shared.set_on_line(true);
                        shared.navigator_events.raise(SignalSet::LINE_UPDATE);
                    }
                    // Cancel sent by the halt that ends each drive
                    control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                }
            })
        };

        assert!(!link.drive_until_line_found(60, Direction::FORWARD, 30).unwrap());
        assert!(link.drive_until_line_found(60, Direction::FORWARD, 30).unwrap());
        helper.join().unwrap();
    }

    #[test]
    fn test_spurious_line_update_is_ignored() {
        let (mut link, shared, _propulsion_rx, control_rx) = link();

        let helper = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                // Still off the line: must not end the search
                shared.navigator_events.raise(SignalSet::LINE_UPDATE);
                thread::sleep(Duration::from_millis(20));
                shared.set_on_line(true);
                shared.navigator_events.raise(SignalSet::LINE_UPDATE);
            })
        };

        assert!(link.drive_until_line_found(75, Direction::FORWARD, 0).unwrap());
        helper.join().unwrap();
    }

    #[test]
    fn test_steer_to_waits_for_completion() {
        let (mut link, shared, propulsion_rx, control_rx) = link();

        let helper = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || loop {
                let request = control_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                if let ControlRequest::Steer { target } = request {
                    assert_eq!(target, -30);
                    shared.navigator_events.raise(SignalSet::STEER_DONE);
                    break;
                }
            })
        };

        link.steer_to(-30).unwrap();
        helper.join().unwrap();

        // Propulsion is stopped before the servo is armed
        assert_eq!(propulsion_rx.try_recv().unwrap(), PropulsionCommand::Stop);
        assert_eq!(shared.motion().steer_target, -30);
        assert!(shared.navigator_events.peek(SignalSet::STEER_DONE).is_empty());
    }

    #[test]
    fn test_obstacle_watch_refuses_to_drive_into_obstacle() {
        let (mut link, shared, propulsion_rx, _control_rx) = link();
        shared.set_obstacle(true);
        link.set_obstacle_watch(true);

        assert!(!link.drive_until_line_found(75, Direction::FORWARD, 10).unwrap());
        assert!(propulsion_rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_an_error() {
        let (mut link, _, propulsion_rx, control_rx) = link();
        drop(propulsion_rx);
        drop(control_rx);

        assert!(matches!(
            link.steer_to(10),
            Err(Error::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_shutdown_interrupts_drive() {
        let (mut link, shared, _propulsion_rx, _control_rx) = link();
        shared.set_on_line(true);

        let closer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                shared.signal_shutdown();
            })
        };

        assert!(matches!(
            link.drive_while_on_line(75, Direction::FORWARD, 0),
            Err(Error::Shutdown)
        ));
        closer.join().unwrap();
    }
}
