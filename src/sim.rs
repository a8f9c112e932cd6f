/*
 * This file is part of autoz.
 *
 * Copyright (C) 2025 autoz contributors
 *
 * autoz is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * autoz is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with autoz. If not, see <https://www.gnu.org/licenses/>.
 */

//! Simulated printer
//!
//! A toolhead with axis limits, a bed sensor and a precision probe sharing one
//! machine state. Machine coordinates are physical; toolhead coordinates differ from
//! them by the Z shift that homing introduces.

use std::cell::RefCell;
use std::rc::Rc;

use az_core::{AutoZError, Motion, Position, ProbeSensor, Result};
use tracing::trace;

use crate::config::SimulatorConfig;

/// Shared machine state
#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    /// Physical nozzle position
    pub machine: Position,
    /// Toolhead Z minus machine Z
    pub z_shift: f64,
    pub z_trim: f64,
    pub max_accel: f64,
    /// Lowest acceleration limit seen while a sensor was descending
    pub probe_accel_seen: Option<f64>,
    pub moves: usize,
    pub triggers: usize,
}

impl SimState {
    fn toolhead(&self) -> Position {
        self.machine.with_z(self.machine.z + self.z_shift)
    }
}

/// Handle to a simulated printer
#[derive(Debug, Clone)]
pub struct SimPrinter {
    config: Rc<SimulatorConfig>,
    state: Rc<RefCell<SimState>>,
}

impl SimPrinter {
    pub fn new(config: SimulatorConfig) -> Self {
        let [x, y, z] = config.start;
        let state = SimState {
            machine: Position::new(x, y, z),
            z_shift: 0.0,
            z_trim: 0.0,
            max_accel: config.max_accel,
            probe_accel_seen: None,
            moves: 0,
            triggers: 0,
        };
        Self {
            config: Rc::new(config),
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Snapshot of the machine state
    pub fn state(&self) -> SimState {
        self.state.borrow().clone()
    }

    pub fn motion(&self) -> SimMotion {
        SimMotion {
            config: Rc::clone(&self.config),
            state: Rc::clone(&self.state),
        }
    }

    /// Sensor embedded in the bed, triggering at the nozzle
    pub fn bed_sensor(&self) -> SimSensor {
        SimSensor {
            name: "bed_sensor".to_string(),
            trigger: self.config.bed_trigger,
            noise: self.config.bed_noise.clone(),
            xy_offset: (0.0, 0.0),
            config: Rc::clone(&self.config),
            state: Rc::clone(&self.state),
            fired: 0,
        }
    }

    /// Precision probe mounted on the toolhead at `xy_offset`
    pub fn probe(&self, xy_offset: (f64, f64)) -> SimSensor {
        SimSensor {
            name: "probe".to_string(),
            trigger: self.config.probe_trigger,
            noise: self.config.probe_noise.clone(),
            xy_offset,
            config: Rc::clone(&self.config),
            state: Rc::clone(&self.state),
            fired: 0,
        }
    }
}

/// Simulated toolhead
pub struct SimMotion {
    config: Rc<SimulatorConfig>,
    state: Rc<RefCell<SimState>>,
}

impl SimMotion {
    fn check_limits(&self, machine: Position) -> Result<()> {
        let c = &self.config;
        let axes = [
            ("x", machine.x, 0.0, c.x_max),
            ("y", machine.y, 0.0, c.y_max),
            ("z", machine.z, c.z_min, c.z_max),
        ];
        for (axis, value, min, max) in axes {
            if !value.is_finite() || value < min || value > max {
                return Err(AutoZError::motion(format!(
                    "{}={:.3} outside [{:.3}, {:.3}]",
                    axis, value, min, max
                )));
            }
        }
        Ok(())
    }
}

impl Motion for SimMotion {
    fn position(&self) -> Position {
        self.state.borrow().toolhead()
    }

    fn move_to(&mut self, target: Position, speed: f64) -> Result<()> {
        if !(speed > 0.0) {
            return Err(AutoZError::motion(format!("invalid speed {}", speed)));
        }
        let machine = {
            let state = self.state.borrow();
            target.with_z(target.z - state.z_shift)
        };
        self.check_limits(machine)?;
        let mut state = self.state.borrow_mut();
        trace!("move to {} at {:.1}mm/s", target, speed);
        state.machine = machine;
        state.moves += 1;
        Ok(())
    }

    fn set_position(&mut self, position: Position) {
        let mut state = self.state.borrow_mut();
        state.machine.x = position.x;
        state.machine.y = position.y;
        state.z_shift = position.z - state.machine.z;
    }

    fn z_trim(&self) -> f64 {
        self.state.borrow().z_trim
    }

    fn set_z_trim(&mut self, z: f64) {
        self.state.borrow_mut().z_trim = z;
    }

    fn max_accel(&self) -> f64 {
        self.state.borrow().max_accel
    }

    fn set_max_accel(&mut self, accel: f64) {
        self.state.borrow_mut().max_accel = accel;
    }
}

/// Simulated height sensor over a flat bed
pub struct SimSensor {
    name: String,
    /// Trigger height above the bed surface
    trigger: f64,
    noise: Vec<f64>,
    xy_offset: (f64, f64),
    config: Rc<SimulatorConfig>,
    state: Rc<RefCell<SimState>>,
    fired: usize,
}

impl SimSensor {
    fn next_noise(&mut self) -> f64 {
        if self.noise.is_empty() {
            return 0.0;
        }
        let value = self.noise[self.fired % self.noise.len()];
        self.fired += 1;
        value
    }
}

impl ProbeSensor for SimSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn xy_offset(&self) -> (f64, f64) {
        self.xy_offset
    }

    fn probe_once(&mut self, motion: &mut dyn Motion, speed: f64) -> Result<Position> {
        let (machine_z, z_shift) = {
            let state = self.state.borrow();
            (state.machine.z, state.z_shift)
        };
        let trigger_machine_z = self.config.bed_height + self.trigger + self.next_noise();
        let travel = machine_z - trigger_machine_z;

        let start = motion.position();
        if travel > self.config.max_travel {
            motion.move_to(start.with_z(start.z - self.config.max_travel), speed)?;
            return Err(AutoZError::sensor_timeout(&self.name, self.config.max_travel));
        }

        let hit = start.with_z(trigger_machine_z + z_shift);
        if travel > 0.0 {
            motion.move_to(hit, speed)?;
        }

        {
            let mut state = self.state.borrow_mut();
            state.triggers += 1;
            let accel = state.max_accel;
            state.probe_accel_seen = Some(state.probe_accel_seen.map_or(accel, |seen| seen.min(accel)));
        }
        trace!("{} triggered at {}", self.name, hit);
        Ok(motion.position())
    }
}
