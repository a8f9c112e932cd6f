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

//! Operator console
//!
//! Turns `NAME KEY=VALUE` lines into orchestrator calls and formats the replies.

use az_core::constants::{keys, sections};
use az_core::{
    AutoZError, AutoZOffset, Bounds, ConfigStore, JsonConfigStore, OffsetMeasurement,
    ParameterOverrides, Result,
};
use az_protocol::{
    Command, ParseError, Request, RequestEnvelope, Response, ResponseData, ResponseEnvelope,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::load_simulator_config;
use crate::logger::log_event;
use crate::sim::SimPrinter;

pub struct Console {
    auto_z: AutoZOffset,
}

impl Console {
    pub fn new(auto_z: AutoZOffset) -> Self {
        Self { auto_z }
    }

    /// Wire the orchestrator to a simulated printer described by `store`
    pub fn simulated(store: JsonConfigStore) -> Result<(Self, SimPrinter)> {
        let sim = SimPrinter::new(load_simulator_config(&store)?);
        let probe_offset = (
            store.get_float(sections::PROBE, keys::X_OFFSET, 0.0, Bounds::none())?,
            store.get_float(sections::PROBE, keys::Y_OFFSET, 0.0, Bounds::none())?,
        );
        let auto_z = AutoZOffset::new(
            Box::new(sim.motion()),
            Box::new(sim.bed_sensor()),
            Box::new(sim.probe(probe_offset)),
            Box::new(store),
        )?;
        Ok((Self::new(auto_z), sim))
    }

    pub fn auto_z(&self) -> &AutoZOffset {
        &self.auto_z
    }

    /// Parse and run one line; blank lines and comments produce nothing
    pub fn execute_line(&mut self, line: &str) -> Option<ResponseEnvelope> {
        match Request::parse(line) {
            Ok(Some(request)) => {
                let envelope = RequestEnvelope::new(request);
                let response = self.execute(&envelope.request);
                Some(ResponseEnvelope::new(envelope.id, response))
            }
            Ok(None) => None,
            Err(parse_error) => {
                let err = match parse_error {
                    ParseError::UnknownCommand(name) => AutoZError::UnknownCommand(name),
                    ParseError::Malformed(reason) => AutoZError::MalformedCommand(reason),
                };
                Some(ResponseEnvelope::new(0, Response::error(err.kind(), err.to_string())))
            }
        }
    }

    pub fn execute(&mut self, request: &Request) -> Response {
        let command = request.command;
        if !command.takes_overrides() && !request.params.is_empty() {
            warn!("{}: ignoring parameters {:?}", command.name(), request.params.keys());
        }
        let overrides: ParameterOverrides = request.params.iter().collect();
        debug!("{} {:?}", command.name(), request.params);

        match self.dispatch(command, &overrides) {
            Ok(data) => Response::Ok(data),
            Err(e) => {
                log_event(
                    "command_failed",
                    json!({ "command": command.name(), "kind": e.kind(), "message": e.to_string() }),
                );
                Response::error(e.kind(), e.to_string())
            }
        }
    }

    fn dispatch(&mut self, command: Command, overrides: &ParameterOverrides) -> Result<ResponseData> {
        let name = self.auto_z.settings().name.clone();
        match command {
            Command::AutoZProbe => {
                let z = self.auto_z.probe_bed(overrides)?;
                log_event("probe", json!({ "z": z }));
                Ok(ResponseData::lines(vec![format!("Result is z={:.6}", z)]).with_value(z))
            }
            Command::AutoZHomeZ => {
                let z = self.auto_z.home_z(overrides)?;
                log_event("home_z", json!({ "z": z }));
                Ok(ResponseData::lines(vec![
                    format!("Result is z={:.6}", z),
                    format!("{}: Z homed with the bed sensor", name),
                ])
                .with_value(z))
            }
            Command::AutoZMeasureOffset => {
                let m = self.auto_z.measure_offset(overrides)?;
                log_event("measure_offset", json!(m));
                Ok(ResponseData::lines(measurement_lines(&name, &m)).with_value(m.probe_z))
            }
            Command::AutoZCalibrate => {
                let run = self.auto_z.calibrate(overrides)?;
                log_event("calibrate", json!(run));
                let mut lines: Vec<String> = run
                    .measurements
                    .iter()
                    .flat_map(|m| measurement_lines(&name, m))
                    .collect();
                lines.extend(saved_lines(&name, run.calibrated_z_offset));
                Ok(ResponseData::lines(lines).with_value(run.calibrated_z_offset))
            }
            Command::AutoZLoadOffset => {
                let value = self.auto_z.load_offset();
                log_event("load_offset", json!({ "calibrated_z_offset": value }));
                Ok(ResponseData::lines(vec![format!("{}: calibrated_z_offset: {:.6}", name, value)]).with_value(value))
            }
            Command::AutoZSaveGcodeOffset => {
                let value = self.auto_z.save_gcode_offset()?;
                log_event("save_gcode_offset", json!({ "calibrated_z_offset": value }));
                Ok(ResponseData::lines(saved_lines(&name, value)).with_value(value))
            }
            Command::AutoZStatus => {
                let status = self.auto_z.status();
                let lines = vec![
                    format!("{}: state: {}", status.name, status.state),
                    format!("last_z_result: {:.6}", status.last_z_result),
                    format!("last_probe_position: {}", status.last_probe_position),
                    format!("calibrated_z_offset: {:.6}", status.calibrated_z_offset),
                    format!("z_trim: {:.6}", status.z_trim),
                    format!("pending_restart: {}", status.pending_restart),
                ];
                Ok(ResponseData::lines(lines).with_report(serde_json::to_value(&status)?))
            }
        }
    }
}

fn measurement_lines(name: &str, m: &OffsetMeasurement) -> Vec<String> {
    vec![
        format!("{}: bed sensor measured offset: z={:.6}", name, m.bed_result),
        format!("{}: probe measured offset: z={:.6}", name, m.probe_z),
    ]
}

fn saved_lines(name: &str, value: f64) -> Vec<String> {
    vec![
        format!("{}: calibrated_z_offset: {:.6}", name, value),
        "The configuration file has been updated; the saved value is loaded after a restart.".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{console_with, test_document};
    use az_core::CalibrationState;

    #[test]
    fn test_probe_reports_bed_height() {
        let (mut console, _sim, _dir) = console_with(test_document());
        let reply = console.execute_line("AUTO_Z_PROBE").unwrap();
        let Response::Ok(data) = reply.response else { panic!("probe failed") };
        // Bed sensor triggers 0.1 below the bed, z_offset is -0.1
        assert!(data.value.unwrap().abs() < 1e-9);
        assert_eq!(data.lines.len(), 1);
        assert!(data.lines[0].starts_with("Result is z="));
    }

    #[test]
    fn test_calibrate_reports_negated_discrepancy() {
        let (mut console, sim, _dir) = console_with(test_document());
        let reply = console.execute_line("AUTO_Z_CALIBRATE").unwrap();
        assert!(reply.response.is_ok(), "{}", reply.response.render());
        let Response::Ok(data) = reply.response else { unreachable!() };
        assert!((data.value.unwrap() + 0.05).abs() < 1e-9);
        assert!(data.lines.iter().any(|l| l == "auto_z_offset: calibrated_z_offset: -0.050000"));
        assert!((sim.state().z_trim + 0.05).abs() < 1e-9);
        assert_eq!(console.auto_z().state(), CalibrationState::Persisted);
    }

    #[test]
    fn test_override_error_is_reported_as_text() {
        let (mut console, sim, _dir) = console_with(test_document());
        let reply = console.execute_line("AUTO_Z_PROBE SAMPLES=2").unwrap();
        match &reply.response {
            Response::Error { kind, message } => {
                assert_eq!(kind, "invalid_parameter");
                assert!(message.contains("SAMPLES"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sim.state().moves, 0);
    }

    #[test]
    fn test_unknown_command() {
        let (mut console, _sim, _dir) = console_with(test_document());
        let reply = console.execute_line("G28 X").unwrap();
        match &reply.response {
            Response::Error { kind, message } => {
                assert_eq!(kind, "protocol");
                assert!(message.contains("G28"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(console.execute_line("# comment").is_none());

        // An oversized line that starts with a real command is malformed, not unknown
        let long = format!("AUTO_Z_PROBE SAMPLES={}", "9".repeat(2048));
        let reply = console.execute_line(&long).unwrap();
        match &reply.response {
            Response::Error { kind, message } => {
                assert_eq!(kind, "protocol");
                assert!(!message.contains("Unknown command"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_status_report() {
        let (mut console, _sim, _dir) = console_with(test_document());
        console.execute_line("AUTO_Z_LOAD_OFFSET").unwrap();
        let reply = console.execute_line("AUTO_Z_STATUS").unwrap();
        let Response::Ok(data) = reply.response else { panic!("status failed") };
        let report = data.report.unwrap();
        assert_eq!(report["state"], "calibrated");
        assert_eq!(report["pending_restart"], false);
    }
}
