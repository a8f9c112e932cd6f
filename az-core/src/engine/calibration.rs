//! Z offset calibration orchestrator
//!
//! Composes the bed sensor and the precision probe into the operator operations:
//!
//! - **probe**: bed height at the reference point
//! - **home_z**: make the bed surface the Z origin using the bed sensor
//! - **measure_offset**: home, then let the precision probe measure its discrepancy
//! - **calibrate**: average several measurements, apply and persist the result
//! - **load_offset** / **save_gcode_offset**: apply or save the offset without probing
//!
//! A failed probing step aborts the operation, leaves the previous calibrated offset in
//! place and returns the orchestrator to [`CalibrationState::Idle`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{auto_z, keys, sections};
use crate::data::{
    AutoZStatus, Bounds, CalibrationState, ConfigStore, Endpoint, ParameterOverrides,
    ParameterResolver, Position, ProbeParameters, ReducedMeasurement, validate_offset,
};
use crate::engine::offset::{apply_offset, CalibrationOffset};
use crate::engine::session::SamplingSession;
use crate::error::Result;
use crate::hw::{Motion, ProbeSensor, SampleAcquirer};

/// Static orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoZSettings {
    /// Configuration section, also used as the display name
    pub name: String,
    /// Trigger height of the bed sensor
    pub z_offset: f64,
    pub probe_hop: f64,
    pub offset_samples: usize,
    pub probe_accel: f64,
    /// Bed centre
    pub reference: (f64, f64),
}

impl AutoZSettings {
    pub fn from_config(config: &dyn ConfigStore, section: &str) -> Result<Self> {
        let z_offset = config.get_float(section, keys::Z_OFFSET, auto_z::DEFAULT_Z_OFFSET, Bounds::none())?;
        let probe_hop = config.get_float(
            section,
            keys::PROBE_HOP,
            auto_z::DEFAULT_PROBE_HOP,
            Bounds::min(auto_z::MIN_PROBE_HOP),
        )?;
        let offset_samples = config.get_int(
            section,
            keys::OFFSET_SAMPLES,
            auto_z::DEFAULT_OFFSET_SAMPLES,
            Bounds::min(auto_z::MIN_OFFSET_SAMPLES as f64),
        )?;
        let probe_accel =
            config.get_float(section, keys::PROBE_ACCEL, auto_z::DEFAULT_PROBE_ACCEL, Bounds::min(0.0))?;
        let reference_x =
            config.get_float(section, keys::REFERENCE_X, auto_z::DEFAULT_REFERENCE_X, Bounds::none())?;
        let reference_y =
            config.get_float(section, keys::REFERENCE_Y, auto_z::DEFAULT_REFERENCE_Y, Bounds::none())?;

        Ok(Self {
            name: section.to_string(),
            z_offset,
            probe_hop,
            offset_samples: offset_samples as usize,
            probe_accel,
            reference: (reference_x, reference_y),
        })
    }
}

/// One bed-sensor homing plus precision-probe measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OffsetMeasurement {
    /// Bed height estimate from the bed sensor
    pub bed_result: f64,
    /// Z reported by the precision probe after homing
    pub probe_z: f64,
}

/// Outcome of a full calibration run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRun {
    pub measurements: Vec<OffsetMeasurement>,
    pub calibrated_z_offset: f64,
}

/// Automatic Z offset calibration for one bed sensor and one precision probe
pub struct AutoZOffset {
    settings: AutoZSettings,
    motion: Box<dyn Motion>,
    bed_sensor: Box<dyn ProbeSensor>,
    probe: Box<dyn ProbeSensor>,
    config: Box<dyn ConfigStore>,
    bed_params: ParameterResolver,
    probe_params: ParameterResolver,
    offset: CalibrationOffset,
    state: CalibrationState,
    last_z_result: f64,
    last_probe_position: Position,
}

impl AutoZOffset {
    /// Build the orchestrator from the `auto_z_offset` and `probe` configuration sections
    pub fn new(
        motion: Box<dyn Motion>,
        bed_sensor: Box<dyn ProbeSensor>,
        probe: Box<dyn ProbeSensor>,
        config: Box<dyn ConfigStore>,
    ) -> Result<Self> {
        let settings = AutoZSettings::from_config(config.as_ref(), sections::AUTO_Z_OFFSET)?;
        let bed_params = ParameterResolver::from_config(config.as_ref(), sections::AUTO_Z_OFFSET)?;
        let probe_params = ParameterResolver::from_config(config.as_ref(), sections::PROBE)?;
        let offset = CalibrationOffset::load_persisted(config.as_ref(), sections::AUTO_Z_OFFSET)?;

        info!(
            "{}: bed sensor '{}', probe '{}', reference ({:.3}, {:.3})",
            settings.name,
            bed_sensor.name(),
            probe.name(),
            settings.reference.0,
            settings.reference.1
        );

        Ok(Self {
            settings,
            motion,
            bed_sensor,
            probe,
            config,
            bed_params,
            probe_params,
            offset,
            state: CalibrationState::Idle,
            last_z_result: 0.0,
            last_probe_position: Position::default(),
        })
    }

    pub fn settings(&self) -> &AutoZSettings {
        &self.settings
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn motion(&self) -> &dyn Motion {
        self.motion.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    /// Live calibrated offset
    pub fn calibrated_z_offset(&self) -> f64 {
        self.offset.value()
    }

    pub fn status(&self) -> AutoZStatus {
        AutoZStatus {
            name: self.settings.name.clone(),
            state: self.state,
            last_z_result: self.last_z_result,
            last_probe_position: self.last_probe_position,
            calibrated_z_offset: self.offset.value(),
            z_trim: self.motion.z_trim(),
            pending_restart: self.offset.pending_restart(),
        }
    }

    /// Probe the bed height at the reference point with the bed sensor
    pub fn probe_bed(&mut self, overrides: &ParameterOverrides) -> Result<f64> {
        let params = self.bed_params.resolve(overrides)?;
        let result = self.probe_bed_with(&params);
        self.finish(result, CalibrationState::Idle)
    }

    /// Home Z with the bed sensor acting as the endstop
    pub fn home_z(&mut self, overrides: &ParameterOverrides) -> Result<f64> {
        let params = self.bed_params.resolve(overrides)?;
        let result = self.home_z_with(&params);
        self.finish(result, CalibrationState::Homed)
    }

    /// Home Z, then measure the precision probe's discrepancy at the reference point
    pub fn measure_offset(&mut self, overrides: &ParameterOverrides) -> Result<OffsetMeasurement> {
        let bed = self.bed_params.resolve(overrides)?;
        let probe = self.probe_params.resolve(overrides)?;
        let result = self.measure_offset_with(&bed, &probe);
        self.finish(result, CalibrationState::Homed)
    }

    /// Average `offset_samples` measurements, apply the negated mean and persist it
    ///
    /// If persisting fails the new offset stays applied and the error is returned.
    pub fn calibrate(&mut self, overrides: &ParameterOverrides) -> Result<CalibrationRun> {
        let bed = self.bed_params.resolve(overrides)?;
        let probe = self.probe_params.resolve(overrides)?;

        let mut measurements = Vec::with_capacity(self.settings.offset_samples);
        for run in 0..self.settings.offset_samples {
            debug!("{}: alignment measurement {}/{}", self.settings.name, run + 1, self.settings.offset_samples);
            let result = self.measure_offset_with(&bed, &probe);
            measurements.push(self.finish(result, CalibrationState::MeasuringAlignment)?);
        }

        self.transition(CalibrationState::Averaging);
        let mean = measurements.iter().map(|m| m.probe_z).sum::<f64>() / measurements.len() as f64;
        let calibrated = self.finish(validate_offset(-mean), CalibrationState::Averaging)?;

        // A validated offset is always applied; only persisting can fail from here
        let persisted = apply_offset(&mut self.offset, calibrated, self.motion.as_mut(), self.config.as_mut());
        self.transition(CalibrationState::Calibrated);
        persisted?;
        self.transition(CalibrationState::Persisted);
        info!("{}: calibrated_z_offset: {:.6}", self.settings.name, calibrated);

        Ok(CalibrationRun { measurements, calibrated_z_offset: calibrated })
    }

    /// Apply the live calibrated offset as Z trim
    pub fn load_offset(&mut self) -> f64 {
        self.offset.apply(self.motion.as_mut());
        self.transition(CalibrationState::Calibrated);
        self.offset.value()
    }

    /// Save the current Z trim as the calibrated offset
    pub fn save_gcode_offset(&mut self) -> Result<f64> {
        let current = self.motion.z_trim();
        apply_offset(&mut self.offset, current, self.motion.as_mut(), self.config.as_mut())?;
        self.transition(CalibrationState::Persisted);
        Ok(current)
    }

    fn probe_bed_with(&mut self, params: &ProbeParameters) -> Result<f64> {
        self.move_to_reference(params)?;
        self.transition(CalibrationState::Probing);
        let reference = self.settings.reference;
        let measurement = self.sample(Endpoint::BedSensor, params, reference)?;
        self.last_z_result = -measurement.z + self.settings.z_offset;
        info!("{}: Result is z={:.6}", self.settings.name, self.last_z_result);
        Ok(self.last_z_result)
    }

    fn home_z_with(&mut self, params: &ProbeParameters) -> Result<f64> {
        self.move_to_reference(params)?;
        self.lift(params)?;
        let bed_result = self.probe_bed_with(params)?;

        let homed = self.motion.position().with_z(self.settings.z_offset);
        self.motion.set_position(homed);
        self.transition(CalibrationState::Homed);
        self.lift(params)?;
        Ok(bed_result)
    }

    fn measure_offset_with(&mut self, bed: &ProbeParameters, probe: &ProbeParameters) -> Result<OffsetMeasurement> {
        let bed_result = self.home_z_with(bed)?;
        info!("{}: bed sensor measured offset: z={:.6}", self.settings.name, bed_result);

        self.transition(CalibrationState::MeasuringAlignment);
        let (ref_x, ref_y) = self.settings.reference;
        let (x_offset, y_offset) = self.probe.xy_offset();
        let target_xy = (ref_x - x_offset, ref_y - y_offset);
        let current = self.motion.position();
        self.motion.move_to(current.with_xy(target_xy), bed.lift_speed)?;

        let measurement = self.sample(Endpoint::Probe, probe, target_xy)?;
        info!("{}: probe measured offset: z={:.6}", self.settings.name, measurement.z);
        self.lift(bed)?;

        Ok(OffsetMeasurement { bed_result, probe_z: measurement.z })
    }

    /// Travel to the reference XY, raising Z first when too close to the bed
    fn move_to_reference(&mut self, params: &ProbeParameters) -> Result<()> {
        self.transition(CalibrationState::MovingToReference);
        let mut target = self.motion.position().with_xy(self.settings.reference);
        if target.z < auto_z::MIN_TRAVEL_Z {
            target.z = self.settings.probe_hop;
        }
        self.motion.move_to(target, params.lift_speed)
    }

    fn lift(&mut self, params: &ProbeParameters) -> Result<()> {
        let current = self.motion.position();
        let target = current.with_z(current.z + self.settings.probe_hop);
        self.motion.move_to(target, params.lift_speed)
    }

    fn sample(&mut self, endpoint: Endpoint, params: &ProbeParameters, target_xy: (f64, f64)) -> Result<ReducedMeasurement> {
        let (sensor, probe_accel) = match endpoint {
            Endpoint::BedSensor => (self.bed_sensor.as_mut(), self.settings.probe_accel),
            Endpoint::Probe => (self.probe.as_mut(), 0.0),
        };
        let acquirer = SampleAcquirer::new(self.motion.as_mut(), sensor).with_probe_accel(probe_accel);
        let measurement = SamplingSession::new(acquirer).run_probe(params, target_xy)?;
        self.last_probe_position = Position::new(target_xy.0, target_xy.1, measurement.z);
        Ok(measurement)
    }

    /// Settle the state after an operation: `done` on success, `Idle` on failure
    fn finish<T>(&mut self, result: Result<T>, done: CalibrationState) -> Result<T> {
        match result {
            Ok(value) => {
                self.transition(done);
                Ok(value)
            }
            Err(e) => {
                warn!("{}: aborted in state {}: {}", self.settings.name, self.state, e);
                self.transition(CalibrationState::Idle);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: CalibrationState) {
        if self.state != next {
            debug!("{}: {} -> {}", self.settings.name, self.state, next);
            self.state = next;
        }
    }
}
