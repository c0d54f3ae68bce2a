use crate::error::{CmdflowError, Result};
use crate::paths;
use crate::window::{TimeWindow, WindowUnit};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RecognizerConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for session segmentation, scoring and suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Largest gap between two executions that still keeps them in one session.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u32,
    #[serde(default = "default_min_pattern_length")]
    pub min_pattern_length: usize,
    #[serde(default = "default_max_pattern_length")]
    pub max_pattern_length: usize,
    /// Occurrences needed before a sequence counts as a pattern.
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u32,
    /// Share of instances a `key:value` pair must appear in to be "common".
    #[serde(default = "default_common_parameter_threshold")]
    pub common_parameter_threshold: f64,
    /// Commands so frequent that their presence says little about a workflow.
    #[serde(default = "default_high_traffic_commands")]
    pub high_traffic_commands: Vec<String>,
    #[serde(default = "default_high_traffic_penalty")]
    pub high_traffic_penalty: f64,
    #[serde(default = "default_max_common_errors")]
    pub max_common_errors: usize,
    #[serde(default = "default_composite_prefix")]
    pub composite_prefix: String,
    #[serde(default = "default_time_saved_ratio")]
    pub time_saved_ratio: f64,
    /// Drop patterns fully contained in a longer pattern seen at least as often.
    #[serde(default = "default_prune_subsumed")]
    pub prune_subsumed: bool,
    #[serde(default = "default_window")]
    pub default_window: TimeWindow,
    #[serde(default = "default_insights_window")]
    pub insights_window: TimeWindow,
    #[serde(default = "default_min_error_pair_count")]
    pub min_error_pair_count: u32,
    #[serde(default = "default_max_error_samples")]
    pub max_error_samples: usize,
    #[serde(default = "default_top_patterns")]
    pub top_patterns: usize,
    #[serde(default = "default_recommendation_min_frequency")]
    pub recommendation_min_frequency: u32,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_session_timeout() -> u32 {
    30
}

fn default_min_pattern_length() -> usize {
    2
}

fn default_max_pattern_length() -> usize {
    5
}

fn default_min_frequency() -> u32 {
    3
}

fn default_common_parameter_threshold() -> f64 {
    0.5
}

fn default_high_traffic_commands() -> Vec<String> {
    vec!["/commit".to_string(), "/test".to_string()]
}

fn default_high_traffic_penalty() -> f64 {
    2.0
}

fn default_max_common_errors() -> usize {
    5
}

fn default_composite_prefix() -> String {
    "/workflow:".to_string()
}

fn default_time_saved_ratio() -> f64 {
    0.2
}

fn default_prune_subsumed() -> bool {
    true
}

fn default_window() -> TimeWindow {
    TimeWindow::days(7)
}

fn default_insights_window() -> TimeWindow {
    TimeWindow::new(30, WindowUnit::Days)
}

fn default_min_error_pair_count() -> u32 {
    2
}

fn default_max_error_samples() -> usize {
    3
}

fn default_top_patterns() -> usize {
    5
}

fn default_recommendation_min_frequency() -> u32 {
    5
}

fn default_max_recommendations() -> usize {
    10
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: default_session_timeout(),
            min_pattern_length: default_min_pattern_length(),
            max_pattern_length: default_max_pattern_length(),
            min_frequency: default_min_frequency(),
            common_parameter_threshold: default_common_parameter_threshold(),
            high_traffic_commands: default_high_traffic_commands(),
            high_traffic_penalty: default_high_traffic_penalty(),
            max_common_errors: default_max_common_errors(),
            composite_prefix: default_composite_prefix(),
            time_saved_ratio: default_time_saved_ratio(),
            prune_subsumed: default_prune_subsumed(),
            default_window: default_window(),
            insights_window: default_insights_window(),
            min_error_pair_count: default_min_error_pair_count(),
            max_error_samples: default_max_error_samples(),
            top_patterns: default_top_patterns(),
            recommendation_min_frequency: default_recommendation_min_frequency(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl RecognizerConfig {
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_timeout_minutes))
    }

    pub fn is_high_traffic(&self, command: &str) -> bool {
        self.high_traffic_commands.iter().any(|c| c == command)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.min_pattern_length < 2 {
            error(format!(
                "min_pattern_length={} must be at least 2",
                self.min_pattern_length
            ));
        }
        if self.max_pattern_length < self.min_pattern_length {
            error(format!(
                "max_pattern_length={} is smaller than min_pattern_length={}",
                self.max_pattern_length, self.min_pattern_length
            ));
        }
        if self.min_frequency == 0 {
            error("min_frequency must be at least 1".to_string());
        }
        if !(self.common_parameter_threshold > 0.0 && self.common_parameter_threshold <= 1.0) {
            error(format!(
                "common_parameter_threshold={} must be in (0, 1]",
                self.common_parameter_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.time_saved_ratio) {
            error(format!(
                "time_saved_ratio={} must be in [0, 1]",
                self.time_saved_ratio
            ));
        }
        if self.high_traffic_penalty < 0.0 {
            error(format!(
                "high_traffic_penalty={} must not be negative",
                self.high_traffic_penalty
            ));
        }
        if self.session_timeout_minutes == 0 {
            error("session_timeout_minutes must be at least 1".to_string());
        }

        if self.min_frequency == 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "min_frequency=1 turns every sequence into a pattern".to_string(),
            });
        }
        if self.max_pattern_length > 8 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "max_pattern_length={} (>8 is unusual and slows detection)",
                    self.max_pattern_length
                ),
            });
        }
        if self.composite_prefix.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "composite_prefix is empty; suggested names may clash with real commands"
                    .to_string(),
            });
        }
        for c in &self.high_traffic_commands {
            if c.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "high_traffic_commands contains an empty entry".to_string(),
                });
            }
        }

        warnings
    }

    /// Fail with `Configuration` when any error-level problem is present.
    /// Warnings are logged and otherwise ignored.
    pub fn ensure_valid(&self) -> Result<()> {
        let mut errors = Vec::new();
        for w in self.validate() {
            match w.level {
                WarnLevel::Warning => tracing::warn!("recognizer config: {}", w.message),
                WarnLevel::Error => errors.push(w.message),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CmdflowError::Configuration(errors.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            recognizer: RecognizerConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CmdflowError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        write_atomic(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = self.recognizer.validate();
        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }
        warnings
    }
}

/// Replace `path` via a sibling tempfile so a crash never leaves half a config.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
