//! Motion and sensor control interfaces
//!
//! The probing code never talks to hardware directly. The host hands in a
//! [`Motion`] handle for the toolhead and one [`ProbeSensor`] per sensing endpoint.
//!
//! # Coordinates
//!
//! All positions are toolhead coordinates in mm. [`Motion::set_position`] redefines
//! the current toolhead position without moving, which is how homing moves the Z
//! origin. The Z trim is applied on top of that by the working coordinate system.

use crate::data::Position;
use crate::error::Result;

/// Toolhead motion collaborator
///
/// Every call blocks until the move has completed. Implementations reject moves
/// outside the machine limits with [`crate::error::AutoZError::MotionFault`].
#[cfg_attr(test, mockall::automock)]
pub trait Motion {
    /// Current toolhead position
    fn position(&self) -> Position;

    /// Move to `target` at `speed` mm/s
    fn move_to(&mut self, target: Position, speed: f64) -> Result<()>;

    /// Redefine the current position without moving
    fn set_position(&mut self, position: Position);

    /// Z trim of the working coordinate system
    fn z_trim(&self) -> f64;

    /// Replace the Z trim without moving the toolhead
    fn set_z_trim(&mut self, z: f64);

    /// Current acceleration limit in mm/s^2
    fn max_accel(&self) -> f64;

    fn set_max_accel(&mut self, accel: f64);
}

/// Height sensor that triggers while the toolhead descends
pub trait ProbeSensor {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// XY offset of the sensing point relative to the toolhead reference
    fn xy_offset(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Descend from the current position at `speed` until the sensor triggers
    ///
    /// Returns the toolhead position at the trigger. The descent is bounded by the
    /// sensor's maximum travel; running out of travel is a
    /// [`crate::error::AutoZError::SensorTimeout`].
    fn probe_once(&mut self, motion: &mut dyn Motion, speed: f64) -> Result<Position>;

    /// Called once before the first sample of a session
    fn begin_session(&mut self, _motion: &mut dyn Motion) -> Result<()> {
        Ok(())
    }

    /// Called once after the last sample of a session, also after failures
    fn end_session(&mut self) {}
}
