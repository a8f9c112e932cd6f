//! Probe parameter resolution
//!
//! Static defaults come from a configuration section; each invocation may override
//! them with `KEY=VALUE` pairs. Unknown keys are ignored.

use std::collections::HashMap;

use crate::constants::{keys, overrides, probe};
use crate::data::persistence::ConfigStore;
use crate::data::types::{ProbeParameters, ReductionMethod};
use crate::data::validation::{parse_float, parse_int, validate_probe_parameters, Bounds};
use crate::error::{AutoZError, Result};

/// Per-invocation parameter overrides, keyed case-insensitively
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterOverrides {
    values: HashMap<String, String>,
}

impl ParameterOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values.insert(key.as_ref().to_ascii_uppercase(), value.into());
    }

    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ParameterOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (key, value) in iter {
            overrides.insert(key, value);
        }
        overrides
    }
}

/// Resolves [`ProbeParameters`] for one configuration section
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    section: String,
    defaults: ProbeParameters,
}

impl ParameterResolver {
    /// Read and validate the static defaults of `section`
    pub fn from_config(config: &dyn ConfigStore, section: &str) -> Result<Self> {
        let speed = config.get_float(section, keys::SPEED, probe::DEFAULT_SPEED, Bounds::above(0.0))?;
        let lift_speed = config.get_float(section, keys::LIFT_SPEED, speed, Bounds::above(0.0))?;
        let sample_count = config.get_int(
            section,
            keys::SAMPLES,
            probe::DEFAULT_SAMPLES,
            Bounds::min(probe::MIN_SAMPLES as f64),
        )?;
        let retract_distance = config.get_float(
            section,
            keys::SAMPLE_RETRACT_DIST,
            probe::DEFAULT_SAMPLE_RETRACT_DIST,
            Bounds::above(0.0),
        )?;
        let reduction = config.get_choice(
            section,
            keys::SAMPLES_RESULT,
            probe::SAMPLES_RESULT_CHOICES,
            probe::DEFAULT_SAMPLES_RESULT,
        )?;
        let tolerance_mm = config.get_float(
            section,
            keys::SAMPLES_TOLERANCE,
            probe::DEFAULT_SAMPLES_TOLERANCE,
            Bounds::min(0.0),
        )?;
        let max_retries = config.get_int(
            section,
            keys::SAMPLES_TOLERANCE_RETRIES,
            probe::DEFAULT_SAMPLES_TOLERANCE_RETRIES,
            Bounds::min(0.0),
        )?;

        let defaults = ProbeParameters {
            speed,
            lift_speed,
            sample_count: sample_count as usize,
            retract_distance,
            reduction: parse_reduction(keys::SAMPLES_RESULT, &reduction)?,
            tolerance_mm,
            max_retries: to_retries(keys::SAMPLES_TOLERANCE_RETRIES, max_retries)?,
        };
        Self::new(section, defaults)
    }

    /// Resolver with explicit defaults
    pub fn new(section: impl Into<String>, defaults: ProbeParameters) -> Result<Self> {
        validate_probe_parameters(&defaults)?;
        Ok(Self { section: section.into(), defaults })
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn defaults(&self) -> &ProbeParameters {
        &self.defaults
    }

    /// Merge `overrides` over the defaults and validate the result
    pub fn resolve(&self, overrides: &ParameterOverrides) -> Result<ProbeParameters> {
        let mut params = self.defaults.clone();

        if let Some(raw) = overrides.get(overrides::PROBE_SPEED) {
            params.speed = parse_float(overrides::PROBE_SPEED, raw, Bounds::above(0.0))?;
        }
        if let Some(raw) = overrides.get(overrides::LIFT_SPEED) {
            params.lift_speed = parse_float(overrides::LIFT_SPEED, raw, Bounds::above(0.0))?;
        }
        if let Some(raw) = overrides.get(overrides::SAMPLES) {
            let count = parse_int(overrides::SAMPLES, raw, Bounds::min(probe::MIN_SAMPLES as f64))?;
            params.sample_count = count as usize;
        }
        if let Some(raw) = overrides.get(overrides::SAMPLE_RETRACT_DIST) {
            params.retract_distance = parse_float(overrides::SAMPLE_RETRACT_DIST, raw, Bounds::above(0.0))?;
        }
        if let Some(raw) = overrides.get(overrides::SAMPLES_RESULT) {
            params.reduction = parse_reduction(overrides::SAMPLES_RESULT, raw)?;
        }
        if let Some(raw) = overrides.get(overrides::SAMPLES_TOLERANCE) {
            params.tolerance_mm = parse_float(overrides::SAMPLES_TOLERANCE, raw, Bounds::min(0.0))?;
        }
        if let Some(raw) = overrides.get(overrides::SAMPLES_TOLERANCE_RETRIES) {
            let retries = parse_int(overrides::SAMPLES_TOLERANCE_RETRIES, raw, Bounds::min(0.0))?;
            params.max_retries = to_retries(overrides::SAMPLES_TOLERANCE_RETRIES, retries)?;
        }

        validate_probe_parameters(&params)?;
        Ok(params)
    }
}

fn parse_reduction(field: &str, raw: &str) -> Result<ReductionMethod> {
    ReductionMethod::from_name(raw).ok_or_else(|| {
        AutoZError::invalid_parameter(field, format!("'{}' is not one of average, median", raw.trim()))
    })
}

fn to_retries(field: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| AutoZError::invalid_parameter(field, format!("{} is out of range", value)))
}
