/*
 * This file is part of autoz.
 *
 * Copyright (C) 2025 autoz contributors
 *
 * autoz is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * autoz is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with autoz. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use az_core::constants::paths;
use az_core::{AutoZError, JsonConfigStore, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Section holding the simulated printer
pub const SIMULATOR_SECTION: &str = "simulator";

/// Physical model of the simulated printer, in machine coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Machine Z of the bed surface
    pub bed_height: f64,
    /// Bed sensor trigger height relative to the bed surface
    pub bed_trigger: f64,
    /// Precision probe trigger height relative to the bed surface
    pub probe_trigger: f64,
    /// Longest descent of a single probe before it gives up
    pub max_travel: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    /// Toolhead position at power-on
    pub start: [f64; 3],
    /// Repeating per-trigger noise added to the bed sensor
    pub bed_noise: Vec<f64>,
    /// Repeating per-trigger noise added to the precision probe
    pub probe_noise: Vec<f64>,
    pub max_accel: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bed_height: 0.0,
            bed_trigger: -0.1,
            probe_trigger: 0.05,
            max_travel: 30.0,
            x_max: 240.0,
            y_max: 240.0,
            z_min: -5.0,
            z_max: 250.0,
            start: [0.0, 0.0, 10.0],
            bed_noise: Vec::new(),
            probe_noise: Vec::new(),
            max_accel: 3000.0,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("AUTOZ_CONFIG") {
        return PathBuf::from(path);
    }
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("autoz").join(paths::CONFIG_FILE);
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("autoz")
            .join(paths::CONFIG_FILE);
    }
    dirs::config_dir()
        .map(|dir| dir.join("autoz").join(paths::CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(paths::CONFIG_FILE))
}

/// Read the simulator section, defaults when absent
pub fn load_simulator_config(store: &JsonConfigStore) -> Result<SimulatorConfig> {
    match store.section(SIMULATOR_SECTION) {
        Some(section) => serde_json::from_value(section.clone())
            .map_err(|e| AutoZError::config(format!("section '{}': {}", SIMULATOR_SECTION, e))),
        None => Ok(SimulatorConfig::default()),
    }
}

/// Starting document written by `autoz init`
pub fn default_document() -> Value {
    json!({
        "auto_z_offset": {
            "z_offset": -0.1,
            "probe_hop": 5.0,
            "offset_samples": 3,
            "calibrated_z_offset": 0.0,
            "speed": 5.0,
            "samples": 5,
            "sample_retract_dist": 2.0,
            "samples_result": "average",
            "samples_tolerance": 0.1,
            "samples_tolerance_retries": 2
        },
        "probe": {
            "x_offset": 0.0,
            "y_offset": 25.0,
            "speed": 3.0,
            "samples": 3,
            "samples_tolerance": 0.05,
            "samples_tolerance_retries": 2
        },
        "simulator": SimulatorConfig::default(),
    })
}

/// Write the default document to `path`, refusing to replace an existing file
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(AutoZError::config(format!("{} already exists", path.display())));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AutoZError::FileWrite { path: parent.to_path_buf(), source: e })?;
    }
    let contents = serde_json::to_string_pretty(&default_document())?;
    fs::write(path, contents).map_err(|e| AutoZError::FileWrite { path: path.to_path_buf(), source: e })
}
