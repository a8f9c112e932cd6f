//! Test doubles for the motion and sensor collaborators

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::data::Position;
use crate::error::{AutoZError, Result};
use crate::hw::{Motion, ProbeSensor};

/// In-memory toolhead that records every move
#[derive(Debug, Default)]
pub struct FakeMotion {
    position: Position,
    z_trim: f64,
    max_accel: f64,
    moves: Vec<(Position, f64)>,
    homed_at: Rc<RefCell<Vec<Position>>>,
    /// Moves with x above this fail
    x_limit: Option<f64>,
}

impl FakeMotion {
    pub fn at(position: Position) -> Self {
        Self { position, max_accel: 3000.0, ..Self::default() }
    }

    pub fn with_x_limit(mut self, limit: f64) -> Self {
        self.x_limit = Some(limit);
        self
    }

    pub fn moves(&self) -> &[(Position, f64)] {
        &self.moves
    }

    /// Shared record of `set_position` calls, readable after the motion is boxed
    pub fn homed_at(&self) -> Rc<RefCell<Vec<Position>>> {
        Rc::clone(&self.homed_at)
    }
}

impl Motion for FakeMotion {
    fn position(&self) -> Position {
        self.position
    }

    fn move_to(&mut self, target: Position, speed: f64) -> Result<()> {
        if let Some(limit) = self.x_limit {
            if target.x > limit {
                return Err(AutoZError::motion(format!("x={} beyond limit {}", target.x, limit)));
            }
        }
        self.moves.push((target, speed));
        self.position = target;
        Ok(())
    }

    fn set_position(&mut self, position: Position) {
        self.homed_at.borrow_mut().push(position);
        self.position = position;
    }

    fn z_trim(&self) -> f64 {
        self.z_trim
    }

    fn set_z_trim(&mut self, z: f64) {
        self.z_trim = z;
    }

    fn max_accel(&self) -> f64 {
        self.max_accel
    }

    fn set_max_accel(&mut self, accel: f64) {
        self.max_accel = accel;
    }
}

/// Sensor that triggers at a scripted sequence of heights
///
/// Runs out of travel once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedSensor {
    name: String,
    readings: VecDeque<f64>,
    max_travel: f64,
    xy_offset: (f64, f64),
    triggers: usize,
    accel_seen: Rc<RefCell<Vec<f64>>>,
    sessions_begun: usize,
    sessions_ended: usize,
}

impl ScriptedSensor {
    pub fn new(name: &str, readings: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            readings: readings.into(),
            max_travel: 10.0,
            xy_offset: (0.0, 0.0),
            triggers: 0,
            accel_seen: Rc::default(),
            sessions_begun: 0,
            sessions_ended: 0,
        }
    }

    pub fn with_xy_offset(mut self, offset: (f64, f64)) -> Self {
        self.xy_offset = offset;
        self
    }

    pub fn triggers(&self) -> usize {
        self.triggers
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }

    pub fn accel_seen(&self) -> Vec<f64> {
        self.accel_seen.borrow().clone()
    }

    /// Shared acceleration record, readable after the sensor is boxed
    pub fn accel_log(&self) -> Rc<RefCell<Vec<f64>>> {
        Rc::clone(&self.accel_seen)
    }

    pub fn sessions(&self) -> (usize, usize) {
        (self.sessions_begun, self.sessions_ended)
    }
}

impl ProbeSensor for ScriptedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn xy_offset(&self) -> (f64, f64) {
        self.xy_offset
    }

    fn probe_once(&mut self, motion: &mut dyn Motion, speed: f64) -> Result<Position> {
        self.accel_seen.borrow_mut().push(motion.max_accel());
        let z = self
            .readings
            .pop_front()
            .ok_or_else(|| AutoZError::sensor_timeout(&self.name, self.max_travel))?;
        let target = motion.position().with_z(z);
        motion.move_to(target, speed)?;
        self.triggers += 1;
        Ok(target)
    }

    fn begin_session(&mut self, _motion: &mut dyn Motion) -> Result<()> {
        self.sessions_begun += 1;
        Ok(())
    }

    fn end_session(&mut self) {
        self.sessions_ended += 1;
    }
}
