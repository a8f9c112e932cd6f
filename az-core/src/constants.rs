//! Constants and configuration values for autoz
//!
//! Centralizes all magic numbers, section names, keys, and configuration defaults.
//! Never use magic numbers in other files - add them here first.

/// Configuration section names
pub mod sections {
    /// Bed sensor / orchestrator section
    pub const AUTO_Z_OFFSET: &str = "auto_z_offset";

    /// Precision probe section
    pub const PROBE: &str = "probe";
}

/// Configuration keys shared by every probing section
pub mod keys {
    pub const SPEED: &str = "speed";
    pub const LIFT_SPEED: &str = "lift_speed";
    pub const SAMPLES: &str = "samples";
    pub const SAMPLE_RETRACT_DIST: &str = "sample_retract_dist";
    pub const SAMPLES_RESULT: &str = "samples_result";
    pub const SAMPLES_TOLERANCE: &str = "samples_tolerance";
    pub const SAMPLES_TOLERANCE_RETRIES: &str = "samples_tolerance_retries";

    // auto_z_offset only
    pub const Z_OFFSET: &str = "z_offset";
    pub const PROBE_HOP: &str = "probe_hop";
    pub const OFFSET_SAMPLES: &str = "offset_samples";
    pub const CALIBRATED_Z_OFFSET: &str = "calibrated_z_offset";
    pub const PROBE_ACCEL: &str = "probe_accel";
    pub const REFERENCE_X: &str = "reference_x";
    pub const REFERENCE_Y: &str = "reference_y";

    // probe only
    pub const X_OFFSET: &str = "x_offset";
    pub const Y_OFFSET: &str = "y_offset";
}

/// Per-invocation override keys (upper case, as typed by the operator)
pub mod overrides {
    pub const PROBE_SPEED: &str = "PROBE_SPEED";
    pub const LIFT_SPEED: &str = "LIFT_SPEED";
    pub const SAMPLES: &str = "SAMPLES";
    pub const SAMPLE_RETRACT_DIST: &str = "SAMPLE_RETRACT_DIST";
    pub const SAMPLES_RESULT: &str = "SAMPLES_RESULT";
    pub const SAMPLES_TOLERANCE: &str = "SAMPLES_TOLERANCE";
    pub const SAMPLES_TOLERANCE_RETRIES: &str = "SAMPLES_TOLERANCE_RETRIES";
}

/// Sampling defaults
pub mod probe {
    /// Probing speed in mm/s
    pub const DEFAULT_SPEED: f64 = 5.0;

    /// Samples per probing call
    pub const DEFAULT_SAMPLES: i64 = 5;

    /// Minimum sample count: one max and one min are trimmed, at least one must remain
    pub const MIN_SAMPLES: i64 = 3;

    /// Retract distance between samples in mm
    pub const DEFAULT_SAMPLE_RETRACT_DIST: f64 = 2.0;

    /// Maximum allowed spread between samples in mm
    pub const DEFAULT_SAMPLES_TOLERANCE: f64 = 0.100;

    /// Tolerance retries before giving up
    pub const DEFAULT_SAMPLES_TOLERANCE_RETRIES: i64 = 0;

    /// Default reduction method name
    pub const DEFAULT_SAMPLES_RESULT: &str = "average";

    /// Accepted reduction method names
    pub const SAMPLES_RESULT_CHOICES: &[&str] = &["average", "median"];

    /// Two XY coordinates closer than this are treated as the same point
    pub const XY_EPSILON: f64 = 1e-6;
}

/// Orchestrator defaults
pub mod auto_z {
    /// Trigger height of the bed sensor in mm
    pub const DEFAULT_Z_OFFSET: f64 = -0.1;

    /// Lift between probing stages in mm
    pub const DEFAULT_PROBE_HOP: f64 = 5.0;

    /// Lower bound for probe_hop
    pub const MIN_PROBE_HOP: f64 = 4.0;

    /// Alignment measurements averaged by a calibration run
    pub const DEFAULT_OFFSET_SAMPLES: i64 = 3;

    /// Lower bound for offset_samples
    pub const MIN_OFFSET_SAMPLES: i64 = 1;

    /// Calibrated offset used when nothing is stored
    pub const DEFAULT_CALIBRATED_Z_OFFSET: f64 = 0.0;

    /// Probing acceleration (0 = leave the toolhead limit alone)
    pub const DEFAULT_PROBE_ACCEL: f64 = 0.0;

    /// Reference point (bed centre) in mm
    pub const DEFAULT_REFERENCE_X: f64 = 120.0;
    pub const DEFAULT_REFERENCE_Y: f64 = 120.0;

    /// Below this height the toolhead is raised to probe_hop before travelling
    pub const MIN_TRAVEL_Z: f64 = 1.0;

    /// Decimal places used when writing offsets to the configuration
    pub const OFFSET_PRECISION: usize = 6;
}

/// File names
pub mod paths {
    /// Printer configuration document
    pub const CONFIG_FILE: &str = "printer.json";

    /// Extension used for the temporary file of atomic writes
    pub const TEMP_EXTENSION: &str = "json.tmp";
}
