//! Core data types for autoz
//!
//! Defines the primary data structures shared by the probing and calibration code.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A toolhead coordinate in mm
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// XY part of the coordinate
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Same point with a different Z
    pub fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }

    /// Same height at a different XY
    pub fn with_xy(self, (x, y): (f64, f64)) -> Self {
        Self { x, y, ..self }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={:.3} y={:.3} z={:.6}", self.x, self.y, self.z)
    }
}

/// How an accepted, trimmed batch is folded into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Average,
    Median,
}

impl ReductionMethod {
    /// Parse a configuration or override value (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "average" => Some(Self::Average),
            "median" => Some(Self::Median),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Median => "median",
        }
    }
}

/// Parameters of one probing call
///
/// Resolved once per invocation by [`crate::data::ParameterResolver`] and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeParameters {
    /// Probing speed in mm/s
    pub speed: f64,
    /// Speed for lifts and retracts in mm/s
    pub lift_speed: f64,
    /// Samples that make up an accepted batch (>= 3)
    pub sample_count: usize,
    /// Retract between samples in mm
    pub retract_distance: f64,
    pub reduction: ReductionMethod,
    /// Maximum spread of an accepted batch in mm
    pub tolerance_mm: f64,
    /// Batches that may be discarded before giving up
    pub max_retries: u32,
}

impl Default for ProbeParameters {
    fn default() -> Self {
        use crate::constants::probe;
        Self {
            speed: probe::DEFAULT_SPEED,
            lift_speed: probe::DEFAULT_SPEED,
            sample_count: probe::DEFAULT_SAMPLES as usize,
            retract_distance: probe::DEFAULT_SAMPLE_RETRACT_DIST,
            reduction: ReductionMethod::Average,
            tolerance_mm: probe::DEFAULT_SAMPLES_TOLERANCE,
            max_retries: probe::DEFAULT_SAMPLES_TOLERANCE_RETRIES as u32,
        }
    }
}

/// Result of one sampling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedMeasurement {
    /// Reduced Z value
    pub z: f64,
    /// Spread (max z - min z) of the accepted batch
    pub spread: f64,
    /// Batches discarded before this one was accepted
    pub retries: u32,
    /// Samples left after trimming
    pub reduced_from: usize,
}

/// Sampling endpoint used by a probing step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Coarse sensor embedded in the bed
    BedSensor,
    /// Precision probe on the toolhead
    Probe,
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    Idle,
    MovingToReference,
    Probing,
    Homed,
    MeasuringAlignment,
    Averaging,
    /// Offset computed and applied, not yet saved
    Calibrated,
    /// Offset written to durable configuration
    Persisted,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MovingToReference => "moving_to_reference",
            Self::Probing => "probing",
            Self::Homed => "homed",
            Self::MeasuringAlignment => "measuring_alignment",
            Self::Averaging => "averaging",
            Self::Calibrated => "calibrated",
            Self::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Snapshot reported by the status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoZStatus {
    pub name: String,
    pub state: CalibrationState,
    /// Bed height estimate from the last bed-sensor probe
    pub last_z_result: f64,
    pub last_probe_position: Position,
    /// Live calibrated offset
    pub calibrated_z_offset: f64,
    /// Z trim currently applied to the working coordinate system
    pub z_trim: f64,
    /// A saved offset is waiting for a restart to reach the configuration snapshot
    pub pending_restart: bool,
}
