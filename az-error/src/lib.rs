//! Unified error handling for autoz
//!
//! This crate provides a single error type used across all autoz components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using AutoZError
pub type Result<T> = std::result::Result<T, AutoZError>;

/// Unified error type for all autoz operations
#[derive(thiserror::Error, Debug)]
pub enum AutoZError {
    // ============================================================================
    // Probing Errors
    // ============================================================================
    #[error("{sensor}: no trigger within {travel:.3}mm of travel")]
    SensorTimeout {
        sensor: String,
        travel: f64,
    },

    #[error("Move rejected: {0}")]
    MotionFault(String),

    #[error(
        "{sensor}: probe samples exceed samples_tolerance \
         (spread {spread:.6}mm > {tolerance:.6}mm after {retries} retries)"
    )]
    ToleranceExceeded {
        sensor: String,
        spread: f64,
        tolerance: f64,
        retries: u32,
    },

    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter {
        field: String,
        reason: String,
    },

    #[error("Invalid offset value: {0}")]
    InvalidOffset(f64),

    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Operator Protocol Errors
    // ============================================================================
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}

impl AutoZError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a motion fault from a string
    pub fn motion(msg: impl Into<String>) -> Self {
        Self::MotionFault(msg.into())
    }

    /// Create an invalid parameter error naming the offending field
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a sensor timeout error
    pub fn sensor_timeout(sensor: impl Into<String>, travel: f64) -> Self {
        Self::SensorTimeout {
            sensor: sensor.into(),
            travel,
        }
    }

    /// Short machine-readable name of the error kind, used in operator responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SensorTimeout { .. } => "sensor_timeout",
            Self::MotionFault(_) => "motion_fault",
            Self::ToleranceExceeded { .. } => "tolerance_exceeded",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidOffset(_) => "invalid_offset",
            Self::Io(_) | Self::FileRead { .. } | Self::FileWrite { .. } => "io",
            Self::Config(_) | Self::JsonParse(_) => "config",
            Self::UnknownCommand(_) | Self::MalformedCommand(_) => "protocol",
        }
    }

    /// Whether the failure came from the probing hardware path
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            Self::SensorTimeout { .. } | Self::MotionFault(_) | Self::ToleranceExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_names_field() {
        let err = AutoZError::invalid_parameter("samples", "must be at least 3");
        assert_eq!(err.to_string(), "Invalid parameter samples: must be at least 3");
        assert_eq!(err.kind(), "invalid_parameter");
        assert!(!err.is_probe_failure());
    }

    #[test]
    fn test_tolerance_message() {
        let err = AutoZError::ToleranceExceeded {
            sensor: "auto_z_offset".to_string(),
            spread: 4.0,
            tolerance: 0.05,
            retries: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("exceed samples_tolerance"));
        assert!(msg.contains("after 2 retries"));
        assert!(err.is_probe_failure());
    }

    #[test]
    fn test_io_conversion() {
        let err: AutoZError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(err.kind(), "io");
    }
}
