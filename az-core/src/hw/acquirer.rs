//! Single-sample acquisition
//!
//! Wraps one sensor and the toolhead: moves to the probing point, triggers the
//! sensor once and retracts between samples.

use tracing::debug;

use crate::constants::probe;
use crate::data::{Position, ProbeParameters};
use crate::error::Result;
use crate::hw::control::{Motion, ProbeSensor};

/// Performs physical probe operations for one sensor
///
/// Holds exclusive borrows of the toolhead and the sensor, so two acquirers can never
/// drive the same toolhead at once.
pub struct SampleAcquirer<'a> {
    motion: &'a mut dyn Motion,
    sensor: &'a mut dyn ProbeSensor,
    /// Acceleration used while probing (0 = unchanged)
    probe_accel: f64,
}

impl<'a> SampleAcquirer<'a> {
    pub fn new(motion: &'a mut dyn Motion, sensor: &'a mut dyn ProbeSensor) -> Self {
        Self { motion, sensor, probe_accel: 0.0 }
    }

    /// Lower the acceleration limit for the duration of each probing move
    pub fn with_probe_accel(mut self, accel: f64) -> Self {
        self.probe_accel = accel.max(0.0);
        self
    }

    pub fn sensor_name(&self) -> &str {
        self.sensor.name()
    }

    /// Notify the sensor that a sampling session starts
    pub fn begin(&mut self) -> Result<()> {
        self.sensor.begin_session(&mut *self.motion)
    }

    /// Notify the sensor that the sampling session is over
    pub fn end(&mut self) {
        self.sensor.end_session();
    }

    /// Probe once at `target_xy`, travelling there first if needed
    pub fn acquire_one(&mut self, target_xy: (f64, f64), params: &ProbeParameters) -> Result<Position> {
        let current = self.motion.position();
        if !same_xy(current.xy(), target_xy) {
            self.motion.move_to(current.with_xy(target_xy), params.lift_speed)?;
        }

        let restore_accel = if self.probe_accel > 0.0 {
            let previous = self.motion.max_accel();
            self.motion.set_max_accel(self.probe_accel);
            Some(previous)
        } else {
            None
        };

        let result = self.sensor.probe_once(&mut *self.motion, params.speed);

        if let Some(previous) = restore_accel {
            self.motion.set_max_accel(previous);
        }

        let position = result?;
        debug!("{}: sample at {}", self.sensor.name(), position);
        Ok(position)
    }

    /// Lift back to `retract_distance` above the trigger point of `sample`
    pub fn retract(&mut self, target_xy: (f64, f64), sample: &Position, params: &ProbeParameters) -> Result<()> {
        let (x, y) = target_xy;
        let target = Position::new(x, y, sample.z + params.retract_distance);
        self.motion.move_to(target, params.lift_speed)
    }
}

fn same_xy(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < probe::XY_EPSILON && (a.1 - b.1).abs() < probe::XY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutoZError;
    use crate::hw::control::MockMotion;
    use crate::test_utils::{FakeMotion, ScriptedSensor};
    use mockall::predicate::*;

    #[test]
    fn test_moves_only_when_xy_differs() {
        let mut motion = MockMotion::new();
        motion.expect_position().return_const(Position::new(0.0, 0.0, 10.0));
        motion
            .expect_move_to()
            .with(eq(Position::new(120.0, 120.0, 10.0)), eq(5.0))
            .times(1)
            .returning(|_, _| Ok(()));
        motion.expect_move_to().returning(|_, _| Ok(()));

        let mut sensor = ScriptedSensor::new("bed", vec![0.5]);
        let mut acquirer = SampleAcquirer::new(&mut motion, &mut sensor);
        let params = ProbeParameters::default();
        let pos = acquirer.acquire_one((120.0, 120.0), &params).unwrap();
        assert_eq!(pos.z, 0.5);
    }

    #[test]
    fn test_motion_fault_propagates() {
        let mut motion = MockMotion::new();
        motion.expect_position().return_const(Position::new(0.0, 0.0, 10.0));
        motion
            .expect_move_to()
            .returning(|_, _| Err(AutoZError::motion("x out of range")));

        let mut sensor = ScriptedSensor::new("bed", vec![0.5]);
        let mut acquirer = SampleAcquirer::new(&mut motion, &mut sensor);
        let err = acquirer.acquire_one((500.0, 0.0), &ProbeParameters::default()).unwrap_err();
        assert!(matches!(err, AutoZError::MotionFault(_)));
        assert_eq!(sensor.triggers(), 0);
    }

    #[test]
    fn test_probe_accel_restored_after_timeout() {
        let mut motion = FakeMotion::at(Position::new(120.0, 120.0, 10.0));
        motion.set_max_accel(3000.0);
        let mut sensor = ScriptedSensor::new("bed", vec![]);
        {
            let mut acquirer = SampleAcquirer::new(&mut motion, &mut sensor).with_probe_accel(500.0);
            let err = acquirer.acquire_one((120.0, 120.0), &ProbeParameters::default()).unwrap_err();
            assert!(matches!(err, AutoZError::SensorTimeout { .. }));
        }
        assert_eq!(sensor.accel_seen(), vec![500.0]);
        assert_eq!(motion.max_accel(), 3000.0);
    }

    #[test]
    fn test_retract_goes_back_to_probe_xy() {
        let mut motion = FakeMotion::at(Position::new(120.0, 120.0, 10.0));
        let mut sensor = ScriptedSensor::new("bed", vec![0.25]);
        let params = ProbeParameters { retract_distance: 2.0, lift_speed: 8.0, ..ProbeParameters::default() };
        {
            let mut acquirer = SampleAcquirer::new(&mut motion, &mut sensor);
            let sample = acquirer.acquire_one((120.0, 120.0), &params).unwrap();
            acquirer.retract((120.0, 120.0), &sample, &params).unwrap();
        }
        assert_eq!(motion.position(), Position::new(120.0, 120.0, 2.25));
        assert_eq!(motion.moves().last().map(|(_, speed)| *speed), Some(8.0));
    }
}
