//! Input validation for probing parameters and offsets
//!
//! Every numeric value that reaches the motion path goes through here first, so an
//! out-of-range setting is reported as `InvalidParameter` before anything moves.

use crate::constants::probe;
use crate::data::types::ProbeParameters;
use crate::error::{AutoZError, Result};

/// Allowed range of a numeric setting
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    /// Inclusive lower bound
    pub min: Option<f64>,
    /// Inclusive upper bound
    pub max: Option<f64>,
    /// Exclusive lower bound
    pub above: Option<f64>,
}

impl Bounds {
    /// No constraint beyond finiteness
    pub fn none() -> Self {
        Self::default()
    }

    /// `value >= min`
    pub fn min(min: f64) -> Self {
        Self { min: Some(min), ..Self::default() }
    }

    /// `value > above`
    pub fn above(above: f64) -> Self {
        Self { above: Some(above), ..Self::default() }
    }

    /// Add an inclusive upper bound
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Check `value`, naming `field` on failure
    pub fn check(&self, field: &str, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(AutoZError::invalid_parameter(field, format!("{} is not a finite number", value)));
        }
        if let Some(min) = self.min {
            if value < min {
                return Err(AutoZError::invalid_parameter(
                    field,
                    format!("{} must be at least {}", value, min),
                ));
            }
        }
        if let Some(above) = self.above {
            if value <= above {
                return Err(AutoZError::invalid_parameter(
                    field,
                    format!("{} must be above {}", value, above),
                ));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(AutoZError::invalid_parameter(
                    field,
                    format!("{} must be at most {}", value, max),
                ));
            }
        }
        Ok(value)
    }
}

/// Parse a float setting and check it against `bounds`
pub fn parse_float(field: &str, raw: &str, bounds: Bounds) -> Result<f64> {
    let value = raw.trim().parse::<f64>().map_err(|_| {
        AutoZError::invalid_parameter(field, format!("'{}' is not a number", raw.trim()))
    })?;
    bounds.check(field, value)
}

/// Parse an integer setting and check it against `bounds`
pub fn parse_int(field: &str, raw: &str, bounds: Bounds) -> Result<i64> {
    let value = raw.trim().parse::<i64>().map_err(|_| {
        AutoZError::invalid_parameter(field, format!("'{}' is not an integer", raw.trim()))
    })?;
    bounds.check(field, value as f64)?;
    Ok(value)
}

/// Validates a fully resolved parameter set
pub fn validate_probe_parameters(params: &ProbeParameters) -> Result<()> {
    Bounds::above(0.0).check("speed", params.speed)?;
    Bounds::above(0.0).check("lift_speed", params.lift_speed)?;
    Bounds::above(0.0).check("sample_retract_dist", params.retract_distance)?;
    Bounds::min(0.0).check("samples_tolerance", params.tolerance_mm)?;
    if (params.sample_count as i64) < probe::MIN_SAMPLES {
        return Err(AutoZError::invalid_parameter(
            "samples",
            format!(
                "{} must be at least {} (one high and one low sample are discarded)",
                params.sample_count,
                probe::MIN_SAMPLES
            ),
        ));
    }
    Ok(())
}

/// Validates an offset before it is applied to the working coordinate system
pub fn validate_offset(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(AutoZError::InvalidOffset(value));
    }
    Ok(value)
}
