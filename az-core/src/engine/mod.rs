//! Probing and calibration engine
//!
//! Contains the sampling session, batch reduction, offset handling and the
//! calibration orchestrator.

mod calibration;
mod offset;
mod reduction;
mod session;

pub use calibration::{AutoZOffset, AutoZSettings, CalibrationRun, OffsetMeasurement};
pub use offset::{apply_offset, load_persisted_offset, CalibrationOffset};
pub use reduction::{reduce, spread, trim_extremes};
pub use session::SamplingSession;
