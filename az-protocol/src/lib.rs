use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for correlation
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Maximum length of one command line
pub const MAX_LINE_LENGTH: usize = 1024;

/// Maximum number of KEY=VALUE parameters per command
const MAX_PARAMS: usize = 16;

const MAX_KEY_LENGTH: usize = 32;

const MAX_VALUE_LENGTH: usize = 64;

/// Line prefixes that mark a comment
const COMMENT_PREFIXES: &[char] = &['#', ';'];

/// Generate a unique request ID for correlation
pub fn generate_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    AutoZProbe,
    AutoZHomeZ,
    AutoZMeasureOffset,
    AutoZCalibrate,
    AutoZLoadOffset,
    AutoZSaveGcodeOffset,
    AutoZStatus,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::AutoZProbe,
        Command::AutoZHomeZ,
        Command::AutoZMeasureOffset,
        Command::AutoZCalibrate,
        Command::AutoZLoadOffset,
        Command::AutoZSaveGcodeOffset,
        Command::AutoZStatus,
    ];

    /// Look up a command by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|c| c.name() == upper)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AutoZProbe => "AUTO_Z_PROBE",
            Command::AutoZHomeZ => "AUTO_Z_HOME_Z",
            Command::AutoZMeasureOffset => "AUTO_Z_MEASURE_OFFSET",
            Command::AutoZCalibrate => "AUTO_Z_CALIBRATE",
            Command::AutoZLoadOffset => "AUTO_Z_LOAD_OFFSET",
            Command::AutoZSaveGcodeOffset => "AUTO_Z_SAVE_GCODE_OFFSET",
            Command::AutoZStatus => "AUTO_Z_STATUS",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Command::AutoZProbe => "Probe Z-height at the reference position using the bed sensors",
            Command::AutoZHomeZ => "Home Z using the bed sensors as an endstop",
            Command::AutoZMeasureOffset => "Z-Offset measured by the probe after AUTO_Z_HOME_Z",
            Command::AutoZCalibrate => "Set the Z-Offset by averaging multiple runs of AUTO_Z_MEASURE_OFFSET",
            Command::AutoZLoadOffset => "Apply the calibrated_z_offset saved in the config file",
            Command::AutoZSaveGcodeOffset => "Save the current gcode offset for z as the new calibrated_z_offset",
            Command::AutoZStatus => "Report the calibration state and offsets",
        }
    }

    /// Whether the command accepts probing overrides
    pub fn takes_overrides(&self) -> bool {
        matches!(
            self,
            Command::AutoZProbe | Command::AutoZHomeZ | Command::AutoZMeasureOffset | Command::AutoZCalibrate
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    /// Upper-case parameter names to raw values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Why a console line could not be turned into a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First token is not a known command name
    UnknownCommand(String),
    /// Known command with unusable parameters, or an oversized line
    Malformed(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownCommand(name) => write!(f, "Unknown command: {}", name),
            ParseError::Malformed(reason) => f.write_str(reason),
        }
    }
}

impl std::error::Error for ParseError {}

impl Request {
    pub fn new(command: Command) -> Self {
        Self { command, params: BTreeMap::new() }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_ascii_uppercase(), value.to_string());
        self
    }

    /// Parse a `NAME KEY=VALUE ...` line
    ///
    /// Blank lines and comments yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        if line.len() > MAX_LINE_LENGTH {
            return Err(ParseError::Malformed(format!(
                "Line too long: {} > {} chars",
                line.len(),
                MAX_LINE_LENGTH
            )));
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIXES) {
            return Ok(None);
        }

        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let command = Command::from_name(name).ok_or_else(|| ParseError::UnknownCommand(name.to_string()))?;

        let mut request = Request::new(command);
        for token in tokens {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| {
                    ParseError::Malformed(format!("Malformed parameter '{}': expected KEY=VALUE", token))
                })?;
            request.params.insert(key.to_ascii_uppercase(), value.to_string());
        }
        request.validate().map_err(ParseError::Malformed)?;
        Ok(Some(request))
    }

    /// Validate parameter syntax before dispatch
    pub fn validate(&self) -> Result<(), String> {
        if self.params.len() > MAX_PARAMS {
            return Err(format!("Too many parameters: {} > {}", self.params.len(), MAX_PARAMS));
        }
        for (key, value) in &self.params {
            validate_key(key)?;
            validate_value(key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation and debugging
    pub id: u64,
    /// The actual request
    #[serde(flatten)]
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(request: Request) -> Self {
        Self {
            id: generate_request_id(),
            request,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to
    pub id: u64,
    /// The actual response
    #[serde(flatten)]
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(id: u64, response: Response) -> Self {
        Self { id, response }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    #[serde(rename = "ok")]
    Ok(ResponseData),
    #[serde(rename = "error")]
    Error { kind: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Human-readable status lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
    /// Measured or applied value, when the command produces one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Structured snapshot for status queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<serde_json::Value>,
}

impl ResponseData {
    pub fn lines(lines: Vec<String>) -> Self {
        Self { lines, ..Self::default() }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_report(mut self, report: serde_json::Value) -> Self {
        self.report = Some(report);
        self
    }
}

impl Response {
    pub fn ok_value(lines: Vec<String>, value: f64) -> Self {
        Response::Ok(ResponseData::lines(lines).with_value(value))
    }

    pub fn error(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Response::Error { kind: kind.into(), message: msg.into() }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    /// Text shown to the operator
    pub fn render(&self) -> String {
        match self {
            Response::Ok(data) => data.lines.join("\n"),
            Response::Error { message, .. } => format!("!! {}", message),
        }
    }
}

pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("Parameter name cannot be empty".into());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(format!("Parameter name too long: {} > {} chars", key.len(), MAX_KEY_LENGTH));
    }
    if !key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Err(format!("Invalid parameter name: {}", key));
    }
    Ok(())
}

pub fn validate_value(key: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("Parameter {} has no value", key));
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(format!("Parameter {} value too long: {} > {} chars", key, value.len(), MAX_VALUE_LENGTH));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(format!("Parameter {} contains control characters", key));
    }
    Ok(())
}
