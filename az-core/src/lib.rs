//! autoz Core Library
//!
//! Automatic Z-offset probing and calibration for printers that carry a bed-mounted
//! height sensor next to a precision probe on the toolhead.
//!
//! # Features
//!
//! - **Sampling**: Repeated probing with tolerance checks, bounded retries and outlier trimming
//! - **Homing**: Use the bed sensor as the Z endstop
//! - **Calibration**: Measure the precision probe against the bed sensor and average the result
//! - **Configuration**: Typed, bounded parameters with per-call overrides and atomic saves
//!
//! # Module Structure
//!
//! - `hw/` - Motion and sensor interfaces, single-sample acquisition
//! - `data/` - Data types, parameter resolution, validation, configuration store
//! - `engine/` - Sampling session, reduction, offset handling, orchestrator
//!
//! # Example
//!
//! ```no_run
//! use az_core::{AutoZOffset, JsonConfigStore, Motion, ParameterOverrides, ProbeSensor};
//!
//! fn calibrate(
//!     motion: Box<dyn Motion>,
//!     bed_sensor: Box<dyn ProbeSensor>,
//!     probe: Box<dyn ProbeSensor>,
//! ) -> az_core::Result<f64> {
//!     let config = JsonConfigStore::open("printer.json")?;
//!     let mut auto_z = AutoZOffset::new(motion, bed_sensor, probe, Box::new(config))?;
//!     let run = auto_z.calibrate(&ParameterOverrides::new())?;
//!     Ok(run.calibrated_z_offset)
//! }
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub use az_error as error;

#[cfg(test)]
pub mod test_utils;

// Re-export primary types from data/
pub use data::{
    AutoZStatus, CalibrationState, Endpoint, Position, ProbeParameters, ReducedMeasurement,
    ReductionMethod,
};

// Re-export parameter resolution and configuration from data/
pub use data::{ConfigStore, JsonConfigStore, ParameterOverrides, ParameterResolver};

// Re-export validation functions from data/
pub use data::{parse_float, parse_int, validate_offset, validate_probe_parameters, Bounds};

// Re-export error types
pub use error::{AutoZError, Result};

// Re-export engine types
pub use engine::{
    apply_offset, load_persisted_offset, AutoZOffset, AutoZSettings, CalibrationOffset,
    CalibrationRun, OffsetMeasurement, SamplingSession,
};

// Re-export hardware interfaces from hw/
pub use hw::{Motion, ProbeSensor, SampleAcquirer};
