//! Printer configuration store
//!
//! The configuration is a JSON document of named sections:
//!
//! ```json
//! { "auto_z_offset": { "z_offset": -0.1, "samples": 5 }, "probe": { "x_offset": 0.0 } }
//! ```
//!
//! Values are read from the snapshot taken when the store is opened. Writes go to
//! disk immediately but only become visible to readers after the store is reopened,
//! which is how a restart of the host picks them up.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::constants::paths;
use crate::data::validation::{parse_float, parse_int, Bounds};
use crate::error::{AutoZError, Result};

/// Key/value configuration source with durable writes
pub trait ConfigStore {
    /// Raw value from the live snapshot, rendered as a string
    fn get(&self, section: &str, key: &str) -> Option<String>;

    /// Durably store a value; it becomes visible to [`ConfigStore::get`] after restart
    fn set_value(&mut self, section: &str, key: &str, value: &str) -> Result<()>;

    /// Value written by [`ConfigStore::set_value`] that is still waiting for a restart
    fn pending(&self, section: &str, key: &str) -> Option<String>;

    /// Float setting with default and bounds
    fn get_float(&self, section: &str, key: &str, default: f64, bounds: Bounds) -> Result<f64> {
        match self.get(section, key) {
            Some(raw) => parse_float(key, &raw, bounds),
            None => bounds.check(key, default),
        }
    }

    /// Integer setting with default and bounds
    fn get_int(&self, section: &str, key: &str, default: i64, bounds: Bounds) -> Result<i64> {
        match self.get(section, key) {
            Some(raw) => parse_int(key, &raw, bounds),
            None => {
                bounds.check(key, default as f64)?;
                Ok(default)
            }
        }
    }

    /// Setting restricted to one of `choices` (case-insensitive)
    fn get_choice(&self, section: &str, key: &str, choices: &[&str], default: &str) -> Result<String> {
        let raw = match self.get(section, key) {
            Some(raw) => raw.trim().to_ascii_lowercase(),
            None => return Ok(default.to_string()),
        };
        if choices.contains(&raw.as_str()) {
            Ok(raw)
        } else {
            Err(AutoZError::invalid_parameter(
                key,
                format!("'{}' is not one of {}", raw, choices.join(", ")),
            ))
        }
    }
}

/// JSON-file backed configuration store
#[derive(Debug, Default)]
pub struct JsonConfigStore {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    /// Snapshot taken at open time
    live: Map<String, Value>,
    /// Values written since open
    pending: Map<String, Value>,
}

impl JsonConfigStore {
    /// Open a configuration file; a missing file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let live = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| AutoZError::FileRead { path: path.clone(), source: e })?;
            parse_document(&contents)?
        } else {
            debug!("No configuration found at {:?}, using defaults", path);
            Map::new()
        };
        info!("Loaded {} configuration sections from {:?}", live.len(), path);
        Ok(Self { path: Some(path), live, pending: Map::new() })
    }

    /// In-memory store seeded from a JSON document
    pub fn from_value(document: Value) -> Result<Self> {
        let live = match document {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(AutoZError::config(format!(
                    "configuration root must be an object, found {}",
                    other
                )))
            }
        };
        Ok(Self { path: None, live, pending: Map::new() })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whole section from the live snapshot
    pub fn section(&self, section: &str) -> Option<&Value> {
        self.live.get(section)
    }

    /// Document as it will look after a restart
    pub fn merged(&self) -> Value {
        merge(&self.live, &self.pending)
    }

    fn save(&self, pending: &Map<String, Value>) -> Result<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&merge(&self.live, pending))?;

        // Atomic write - write to temp file then rename
        let temp_path = path.with_extension(paths::TEMP_EXTENSION);
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| AutoZError::FileWrite { path: temp_path.clone(), source: e })?;
        file.write_all(json.as_bytes())
            .map_err(|e| AutoZError::FileWrite { path: temp_path.clone(), source: e })?;
        file.sync_all()
            .map_err(|e| AutoZError::FileWrite { path: temp_path.clone(), source: e })?;
        drop(file);

        fs::rename(&temp_path, path)
            .map_err(|e| AutoZError::FileWrite { path: path.clone(), source: e })?;

        debug!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.live.get(section)?.get(key).and_then(render)
    }

    fn set_value(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let mut pending = self.pending.clone();
        let entry = pending
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(values) = entry {
            values.insert(key.to_string(), to_json(value));
        }
        // Only a value that reached the file counts as pending
        self.save(&pending)?;
        self.pending = pending;
        info!("{}: {} = {} (takes effect after restart)", section, key, value);
        Ok(())
    }

    fn pending(&self, section: &str, key: &str) -> Option<String> {
        self.pending.get(section)?.get(key).and_then(render)
    }
}

fn merge(live: &Map<String, Value>, pending: &Map<String, Value>) -> Value {
    let mut merged = live.clone();
    for (section, values) in pending {
        let target = merged
            .entry(section.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let (Value::Object(target), Value::Object(values)) = (target, values) {
            for (key, value) in values {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn parse_document(contents: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(contents)? {
        Value::Object(map) => {
            for (name, section) in &map {
                if !section.is_object() {
                    return Err(AutoZError::config(format!("section '{}' must be an object", name)));
                }
            }
            Ok(map)
        }
        _ => Err(AutoZError::config("configuration root must be an object")),
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers are stored as JSON numbers, everything else as strings
fn to_json(value: &str) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    match value.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::from(float),
        _ => Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_typed_getters() {
        let store = JsonConfigStore::from_value(json!({
            "auto_z_offset": { "speed": 7.5, "samples": "4", "samples_result": "MEDIAN" }
        }))
        .unwrap();

        assert_eq!(store.get_float("auto_z_offset", "speed", 5.0, Bounds::above(0.0)).unwrap(), 7.5);
        assert_eq!(store.get_int("auto_z_offset", "samples", 5, Bounds::min(3.0)).unwrap(), 4);
        assert_eq!(
            store.get_choice("auto_z_offset", "samples_result", &["average", "median"], "average").unwrap(),
            "median"
        );
        // Missing keys and sections fall back
        assert_eq!(store.get_float("probe", "x_offset", 0.0, Bounds::none()).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_range_names_key() {
        let store = JsonConfigStore::from_value(json!({ "auto_z_offset": { "samples": 2 } })).unwrap();
        match store.get_int("auto_z_offset", "samples", 5, Bounds::min(3.0)) {
            Err(AutoZError::InvalidParameter { field, .. }) => assert_eq!(field, "samples"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(JsonConfigStore::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_write_visible_only_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("printer.json");
        fs::write(&path, r#"{ "auto_z_offset": { "calibrated_z_offset": 0.25 } }"#).unwrap();

        let mut store = JsonConfigStore::open(&path).unwrap();
        store.set_value("auto_z_offset", "calibrated_z_offset", "-0.100000").unwrap();

        // Live snapshot unchanged until restart
        assert_eq!(store.get("auto_z_offset", "calibrated_z_offset").as_deref(), Some("0.25"));
        assert_eq!(store.pending("auto_z_offset", "calibrated_z_offset").as_deref(), Some("-0.1"));
        assert!(!path.with_extension(paths::TEMP_EXTENSION).exists());

        let reopened = JsonConfigStore::open(&path).unwrap();
        assert_eq!(reopened.get("auto_z_offset", "calibrated_z_offset").as_deref(), Some("-0.1"));
        assert!(reopened.pending("auto_z_offset", "calibrated_z_offset").is_none());
    }

    #[test]
    fn test_failed_write_is_not_pending() {
        let dir = TempDir::new().unwrap();
        // Parent "directory" is a regular file, so every save fails
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let mut store = JsonConfigStore::open(blocker.join("printer.json")).unwrap();

        assert!(store.set_value("auto_z_offset", "calibrated_z_offset", "-0.1").is_err());
        assert!(store.pending("auto_z_offset", "calibrated_z_offset").is_none());
        assert!(store.merged()["auto_z_offset"].is_null());
    }

    #[test]
    fn test_failed_write_does_not_leak_into_next_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("printer.json");
        let mut store = JsonConfigStore::open(&path).unwrap();

        // Block the temp file path with a directory, then clear it
        let temp = path.with_extension(paths::TEMP_EXTENSION);
        fs::create_dir(&temp).unwrap();
        assert!(store.set_value("auto_z_offset", "calibrated_z_offset", "-0.1").is_err());
        fs::remove_dir(&temp).unwrap();

        store.set_value("auto_z_offset", "speed", "5").unwrap();
        let reopened = JsonConfigStore::open(&path).unwrap();
        assert!(reopened.get("auto_z_offset", "calibrated_z_offset").is_none());
        assert_eq!(reopened.get("auto_z_offset", "speed").as_deref(), Some("5"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonConfigStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get("auto_z_offset", "z_offset").is_none());
    }
}
