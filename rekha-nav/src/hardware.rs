//! VehicleIo trait definition
//!
//! The raw device capabilities the control core consumes. Port bring-up and
//! teardown belong to the implementation; the core only reads counters and
//! sensors and writes motor power.

/// Drive motors; propulsion always writes both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveMotor {
    Left,
    Right,
}

/// Device abstraction shared by the sampler and the controllers.
///
/// Methods take `&self` because several control loops use the same device
/// concurrently; implementations provide their own interior locking.
pub trait VehicleIo: Send + Sync {
    /// Reflected light level (lower = darker)
    fn read_light(&self) -> i32;

    /// Forward ranging distance
    fn read_range(&self) -> i32;

    /// Steering motor position counter
    fn read_steer_position(&self) -> i32;

    /// Drive motor position counter
    fn read_drive_position(&self) -> i32;

    /// Operator touch sensor; devices without one never report a press
    fn read_touch(&self) -> bool {
        false
    }

    /// Signed drive power; `brake` selects braking over coasting at zero
    fn set_drive_power(&self, motor: DriveMotor, power: i32, brake: bool);

    /// Signed steering motor power
    fn set_steer_power(&self, power: i32);
}
