//! Data types, configuration, and validation modules
//!
//! Contains the probing data structures, parameter resolution and the configuration store.

mod params;
mod persistence;
mod types;
mod validation;

pub use params::{ParameterOverrides, ParameterResolver};
pub use persistence::{ConfigStore, JsonConfigStore};
pub use types::{
    AutoZStatus, CalibrationState, Endpoint, Position, ProbeParameters, ReducedMeasurement,
    ReductionMethod,
};
pub use validation::{
    parse_float, parse_int, validate_offset, validate_probe_parameters, Bounds,
};
