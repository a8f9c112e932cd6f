//! Calibrated Z offset
//!
//! Owns the live calibrated offset, applies it to the working coordinate system and
//! writes it to durable configuration. The live value changes as soon as a new offset
//! is accepted; the configuration snapshot only sees it after a restart.

use tracing::{debug, info};

use crate::constants::{auto_z, keys};
use crate::data::{validate_offset, Bounds, ConfigStore};
use crate::error::Result;
use crate::hw::Motion;

/// Calibrated offset of one configuration section
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOffset {
    section: String,
    value: f64,
    /// Saved value that has not reached the configuration snapshot yet
    pending_restart: bool,
}

impl CalibrationOffset {
    /// Read the stored offset, 0.0 when absent
    pub fn load_persisted(config: &dyn ConfigStore, section: &str) -> Result<Self> {
        let value = config.get_float(
            section,
            keys::CALIBRATED_Z_OFFSET,
            auto_z::DEFAULT_CALIBRATED_Z_OFFSET,
            Bounds::none(),
        )?;
        debug!("{}: stored calibrated_z_offset {:.6}", section, value);
        Ok(Self {
            section: section.to_string(),
            value,
            pending_restart: false,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn pending_restart(&self) -> bool {
        self.pending_restart
    }

    /// Replace the live value as a whole
    pub fn replace(&mut self, value: f64) -> Result<()> {
        self.value = validate_offset(value)?;
        Ok(())
    }

    /// Set the working coordinate system's Z trim to the live value, without moving
    pub fn apply(&self, motion: &mut dyn Motion) {
        motion.set_z_trim(self.value);
        info!("{}: applied z trim {:.6}", self.section, self.value);
    }

    /// Write the live value to durable configuration
    pub fn persist(&mut self, config: &mut dyn ConfigStore) -> Result<()> {
        let rendered = format!("{:.*}", auto_z::OFFSET_PRECISION, self.value);
        config.set_value(&self.section, keys::CALIBRATED_Z_OFFSET, &rendered)?;
        self.pending_restart = true;
        Ok(())
    }
}

/// Stored offset of `section`, 0.0 when absent
pub fn load_persisted_offset(config: &dyn ConfigStore, section: &str) -> Result<f64> {
    Ok(CalibrationOffset::load_persisted(config, section)?.value())
}

/// Replace the live offset, apply it as Z trim and persist it
pub fn apply_offset(
    offset: &mut CalibrationOffset,
    value: f64,
    motion: &mut dyn Motion,
    config: &mut dyn ConfigStore,
) -> Result<()> {
    offset.replace(value)?;
    offset.apply(motion);
    offset.persist(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{JsonConfigStore, Position};
    use crate::error::AutoZError;
    use crate::test_utils::FakeMotion;
    use serde_json::json;

    #[test]
    fn test_load_defaults_to_zero() {
        let store = JsonConfigStore::from_value(json!({})).unwrap();
        let offset = CalibrationOffset::load_persisted(&store, "auto_z_offset").unwrap();
        assert_eq!(offset.value(), 0.0);
        assert!(!offset.pending_restart());

        let store = JsonConfigStore::from_value(json!({
            "auto_z_offset": { "calibrated_z_offset": "-0.250000" }
        }))
        .unwrap();
        assert_eq!(load_persisted_offset(&store, "auto_z_offset").unwrap(), -0.25);
    }

    #[test]
    fn test_apply_offset_sets_trim_and_persists() {
        let mut store = JsonConfigStore::from_value(json!({
            "auto_z_offset": { "calibrated_z_offset": 0.05 }
        }))
        .unwrap();
        let mut motion = FakeMotion::at(Position::default());
        let mut offset = CalibrationOffset::load_persisted(&store, "auto_z_offset").unwrap();
        assert_eq!(offset.value(), 0.05);

        apply_offset(&mut offset, -0.1, &mut motion, &mut store).unwrap();

        assert_eq!(offset.value(), -0.1);
        assert_eq!(motion.z_trim(), -0.1);
        assert!(offset.pending_restart());
        assert_eq!(store.pending("auto_z_offset", "calibrated_z_offset").as_deref(), Some("-0.1"));
        // Snapshot keeps the old value until restart
        assert_eq!(store.get("auto_z_offset", "calibrated_z_offset").as_deref(), Some("0.05"));
        // No toolhead motion
        assert!(motion.moves().is_empty());
    }

    #[test]
    fn test_non_finite_offset_rejected_untouched() {
        let mut store = JsonConfigStore::from_value(json!({})).unwrap();
        let mut motion = FakeMotion::at(Position::default());
        let mut offset = CalibrationOffset::load_persisted(&store, "auto_z_offset").unwrap();

        let err = apply_offset(&mut offset, f64::NAN, &mut motion, &mut store).unwrap_err();
        assert!(matches!(err, AutoZError::InvalidOffset(_)));
        assert_eq!(offset.value(), 0.0);
        assert_eq!(motion.z_trim(), 0.0);
        assert!(store.pending("auto_z_offset", "calibrated_z_offset").is_none());
    }
}
