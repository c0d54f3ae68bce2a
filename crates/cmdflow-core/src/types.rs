use crate::error::{CmdflowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator used in the storage form of a [`CommandSequence`].
pub const KEY_DELIMITER: char = ',';

/// Escapes a literal delimiter (or itself) inside a command in the key.
pub const KEY_ESCAPE: char = '\\';

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scalar / Parameters
// ---------------------------------------------------------------------------

/// A single parameter value. Only scalars are accepted; nested values make
/// the whole parameter map malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

pub type ParameterMap = BTreeMap<String, Scalar>;

/// Parameters as captured by the recorder: either an already-typed map or
/// the raw JSON text handed over by a shell hook, parsed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameters {
    Map(ParameterMap),
    Raw(String),
}

impl Parameters {
    pub fn parse(&self) -> std::result::Result<ParameterMap, String> {
        match self {
            Parameters::Map(map) => Ok(map.clone()),
            Parameters::Raw(text) => {
                serde_json::from_str::<ParameterMap>(text).map_err(|e| e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionRecord
// ---------------------------------------------------------------------------

/// One observed command invocation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionRecord {
    pub fn success(command: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            timestamp,
            outcome: Outcome::Success,
            duration_ms: None,
            parameters: None,
            error_message: None,
        }
    }

    pub fn failure(
        command: impl Into<String>,
        timestamp: DateTime<Utc>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            command: command.into(),
            timestamp,
            outcome: Outcome::Failure,
            duration_ms: None,
            parameters: None,
            error_message,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Parsed parameter map, `Ok(None)` when the record carries none.
    pub fn parameters(&self) -> Result<Option<ParameterMap>> {
        match &self.parameters {
            None => Ok(None),
            Some(p) => p
                .parse()
                .map(Some)
                .map_err(|reason| CmdflowError::MalformedRecord {
                    command: self.command.clone(),
                    reason,
                }),
        }
    }

    /// Error message of a failed execution. Messages on successful records
    /// are ignored.
    pub fn failure_message(&self) -> Option<&str> {
        match self.outcome {
            Outcome::Failure => self.error_message.as_deref(),
            Outcome::Success => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandSequence
// ---------------------------------------------------------------------------

/// Ordered command list identifying a pattern. Grouping always happens on
/// the list itself; the comma-joined key is only the storage form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSequence(Vec<String>);

impl CommandSequence {
    pub fn new(commands: Vec<String>) -> Self {
        Self(commands)
    }

    /// Inverse of [`key`](Self::key). A trailing lone escape is kept literally.
    pub fn from_key(key: &str) -> Self {
        if key.is_empty() {
            return Self(Vec::new());
        }
        let mut commands = Vec::new();
        let mut current = String::new();
        let mut chars = key.chars();
        while let Some(c) = chars.next() {
            match c {
                KEY_ESCAPE => match chars.next() {
                    Some(next) => current.push(next),
                    None => current.push(KEY_ESCAPE),
                },
                KEY_DELIMITER => commands.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        commands.push(current);
        Self(commands)
    }

    /// Storage form: commands joined by `,`, with `,` and `\` inside a
    /// command escaped by a backslash.
    pub fn key(&self) -> String {
        let mut out = String::new();
        for (i, command) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(KEY_DELIMITER);
            }
            for c in command.chars() {
                if c == KEY_DELIMITER || c == KEY_ESCAPE {
                    out.push(KEY_ESCAPE);
                }
                out.push(c);
            }
        }
        out
    }

    pub fn commands(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `prefix` is a (non-strict) prefix of this sequence.
    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.0.starts_with(prefix)
    }

    /// True when `other` appears as a contiguous run inside this sequence.
    pub fn contains_run(&self, other: &CommandSequence) -> bool {
        if other.len() > self.len() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        self.0.windows(other.len()).any(|w| w == other.0.as_slice())
    }

    /// Arrow-joined human form, e.g. `/fix → /test → /commit`.
    pub fn describe(&self) -> String {
        self.0.join(" → ")
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<Vec<&str>> for CommandSequence {
    fn from(v: Vec<&str>) -> Self {
        Self(v.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
