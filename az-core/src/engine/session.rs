//! Multi-sample probing session
//!
//! Collects `sample_count` samples through a [`SampleAcquirer`], enforcing the
//! tolerance on the full batch:
//!
//! 1. **Collect**: probe, append, retract while the batch is not yet full.
//! 2. **Check**: a full batch whose spread exceeds the tolerance is discarded and
//!    sampling restarts from zero, up to `max_retries` times.
//! 3. **Reduce**: drop the highest and lowest sample, then average or take the median.

use tracing::{debug, info, warn};

use crate::data::{Position, ProbeParameters, ReducedMeasurement};
use crate::engine::reduction::{reduce, spread, trim_extremes};
use crate::error::{AutoZError, Result};
use crate::hw::SampleAcquirer;

/// Transient state of one `run_probe` call
#[derive(Debug, Default)]
struct SessionState {
    pending: Vec<Position>,
    retries: u32,
}

/// Runs sampling sessions through one acquirer
pub struct SamplingSession<'a> {
    acquirer: SampleAcquirer<'a>,
}

impl<'a> SamplingSession<'a> {
    pub fn new(acquirer: SampleAcquirer<'a>) -> Self {
        Self { acquirer }
    }

    /// Collect an accepted batch at `target_xy` and reduce it to one measurement
    ///
    /// The sensor is told when the session begins and ends; the end notification is
    /// sent even when sampling fails.
    pub fn run_probe(&mut self, params: &ProbeParameters, target_xy: (f64, f64)) -> Result<ReducedMeasurement> {
        self.acquirer.begin()?;
        let result = self.collect(params, target_xy);
        self.acquirer.end();
        result
    }

    fn collect(&mut self, params: &ProbeParameters, target_xy: (f64, f64)) -> Result<ReducedMeasurement> {
        let mut state = SessionState::default();

        loop {
            let sample = self.acquirer.acquire_one(target_xy, params)?;
            state.pending.push(sample);

            if state.pending.len() == params.sample_count {
                let batch_spread = spread(&state.pending);
                if batch_spread <= params.tolerance_mm {
                    return Ok(self.finish(&state, batch_spread, params));
                }
                if state.retries >= params.max_retries {
                    return Err(AutoZError::ToleranceExceeded {
                        sensor: self.acquirer.sensor_name().to_string(),
                        spread: batch_spread,
                        tolerance: params.tolerance_mm,
                        retries: state.retries,
                    });
                }
                warn!(
                    "{}: probe samples exceed tolerance ({:.6} > {:.6}). Retrying...",
                    self.acquirer.sensor_name(),
                    batch_spread,
                    params.tolerance_mm
                );
                state.retries += 1;
                state.pending.clear();
            }

            self.acquirer.retract(target_xy, &sample, params)?;
        }
    }

    fn finish(&self, state: &SessionState, batch_spread: f64, params: &ProbeParameters) -> ReducedMeasurement {
        let trimmed = trim_extremes(&state.pending);
        let z = reduce(&trimmed, params.reduction);
        debug!(
            "{}: reduced {} of {} samples by {}",
            self.acquirer.sensor_name(),
            trimmed.len(),
            state.pending.len(),
            params.reduction.as_str()
        );
        info!(
            "{}: probe result z={:.6} (spread {:.6}, retries {})",
            self.acquirer.sensor_name(),
            z,
            batch_spread,
            state.retries
        );
        ReducedMeasurement {
            z,
            spread: batch_spread,
            retries: state.retries,
            reduced_from: trimmed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReductionMethod;
    use crate::hw::Motion;
    use crate::test_utils::{FakeMotion, ScriptedSensor};

    const XY: (f64, f64) = (120.0, 120.0);

    fn params(sample_count: usize, tolerance_mm: f64, max_retries: u32) -> ProbeParameters {
        ProbeParameters {
            sample_count,
            tolerance_mm,
            max_retries,
            ..ProbeParameters::default()
        }
    }

    fn run(sensor: &mut ScriptedSensor, params: &ProbeParameters) -> (Result<ReducedMeasurement>, FakeMotion) {
        let mut motion = FakeMotion::at(Position::new(120.0, 120.0, 5.0));
        let result = {
            let acquirer = SampleAcquirer::new(&mut motion, sensor);
            SamplingSession::new(acquirer).run_probe(params, XY)
        };
        (result, motion)
    }

    #[test]
    fn test_accepts_batch_within_tolerance() {
        let mut sensor = ScriptedSensor::new("bed", vec![1.00, 1.02, 0.99, 1.01, 1.03]);
        let (result, motion) = run(&mut sensor, &params(5, 0.05, 0));
        let m = result.unwrap();
        // Trimmed to [1.00, 1.01, 1.02]
        assert!((m.z - 1.01).abs() < 1e-9);
        assert_eq!(m.reduced_from, 3);
        assert_eq!(m.retries, 0);
        // One probe move per sample plus a retract between samples
        let retracts = motion.moves().iter().filter(|(p, _)| p.z > 2.5).count();
        assert_eq!(retracts, 4);
        assert_eq!(sensor.sessions(), (1, 1));
    }

    #[test]
    fn test_outlier_batch_is_retried_from_zero() {
        let mut sensor = ScriptedSensor::new(
            "bed",
            vec![
                1.00, 1.02, 0.99, 1.01, 5.00, // spread 4.01: discarded
                1.00, 1.01, 1.02, 1.00, 1.01,
            ],
        );
        let (result, _) = run(&mut sensor, &params(5, 0.05, 1));
        let m = result.unwrap();
        assert_eq!(m.retries, 1);
        // Only the second batch counts: trimmed [1.00, 1.01, 1.01]
        assert!((m.z - (3.02 / 3.0)).abs() < 1e-9);
        assert_eq!(sensor.triggers(), 10);
    }

    #[test]
    fn test_succeeds_on_last_allowed_retry() {
        let mut readings = Vec::new();
        for _ in 0..3 {
            readings.extend([0.0, 0.5, 1.0]);
        }
        readings.extend([0.20, 0.21, 0.22]);
        let mut sensor = ScriptedSensor::new("bed", readings);
        let (result, _) = run(&mut sensor, &params(3, 0.05, 3));
        let m = result.unwrap();
        assert_eq!(m.retries, 3);
        assert!((m.z - 0.21).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_exceeded_after_retries() {
        let mut sensor = ScriptedSensor::new("bed", vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 9.0]);
        let (result, _) = run(&mut sensor, &params(3, 0.05, 1));
        match result {
            Err(AutoZError::ToleranceExceeded { retries, spread, .. }) => {
                assert_eq!(retries, 1);
                assert!((spread - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        // Stopped at the end of the second batch
        assert_eq!(sensor.remaining(), 1);
        assert_eq!(sensor.sessions(), (1, 1));
    }

    #[test]
    fn test_timeout_propagates_and_ends_session() {
        let mut sensor = ScriptedSensor::new("bed", vec![1.0, 1.0]);
        let (result, _) = run(&mut sensor, &params(3, 0.05, 0));
        assert!(matches!(result, Err(AutoZError::SensorTimeout { .. })));
        assert_eq!(sensor.sessions(), (1, 1));
    }

    #[test]
    fn test_median_reduction() {
        let mut sensor = ScriptedSensor::new("bed", vec![0.10, 0.14, 0.11, 0.12, 0.13, 0.10]);
        let p = ProbeParameters {
            reduction: ReductionMethod::Median,
            ..params(6, 0.05, 0)
        };
        let (result, motion) = run(&mut sensor, &p);
        // Remainder [0.10, 0.11, 0.12, 0.13]: median = (0.11 + 0.12) / 2
        assert!((result.unwrap().z - 0.115).abs() < 1e-9);
        assert_eq!(motion.position().xy(), XY);
    }
}
