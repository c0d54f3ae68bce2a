//! Aggregate analytics over stored patterns and the raw execution log.

use crate::config::RecognizerConfig;
use crate::pattern::generate_suggestion;
use crate::store::FrequentPattern;
use crate::types::{CommandSequence, ExecutionRecord, Outcome};
use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A success immediately followed by a failure, seen repeatedly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub trigger_command: String,
    pub failure_command: String,
    pub count: u32,
    /// Distinct failure messages, in order of first appearance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeBucket {
    HourOfDay { hour: u32 },
    DayOfWeek { day: String },
}

/// A command/time bucket used far more often than the average bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeak {
    pub command: String,
    #[serde(flatten)]
    pub bucket: TimeBucket,
    pub count: u32,
    /// Mean bucket count of the dimension the peak was measured against.
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub commands: CommandSequence,
    pub suggested_name: String,
    pub frequency: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub total_patterns: usize,
    pub top_patterns: Vec<FrequentPattern>,
    pub error_patterns: Vec<ErrorPattern>,
    pub time_patterns: Vec<TimePeak>,
    pub recommendations: Vec<Recommendation>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Assemble the report from frequent patterns (already filtered by
/// `min_frequency`) and chronologically ordered executions.
pub fn build_report(
    mut frequent: Vec<FrequentPattern>,
    executions: &[ExecutionRecord],
    config: &RecognizerConfig,
) -> InsightsReport {
    frequent.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.sequence_key.cmp(&b.sequence_key))
    });

    InsightsReport {
        total_patterns: frequent.len(),
        top_patterns: frequent.iter().take(config.top_patterns).cloned().collect(),
        error_patterns: detect_error_patterns(
            executions,
            config.min_error_pair_count,
            config.max_error_samples,
        ),
        time_patterns: detect_time_patterns(executions),
        recommendations: recommendations(&frequent, config),
    }
}

// ---------------------------------------------------------------------------
// Error patterns
// ---------------------------------------------------------------------------

pub fn detect_error_patterns(
    executions: &[ExecutionRecord],
    min_count: u32,
    max_samples: usize,
) -> Vec<ErrorPattern> {
    let mut pairs: BTreeMap<(String, String), ErrorPattern> = BTreeMap::new();

    for w in executions.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        if prev.outcome != Outcome::Success || cur.outcome != Outcome::Failure {
            continue;
        }
        let entry = pairs
            .entry((prev.command.clone(), cur.command.clone()))
            .or_insert_with(|| ErrorPattern {
                trigger_command: prev.command.clone(),
                failure_command: cur.command.clone(),
                count: 0,
                error_messages: Vec::new(),
            });
        entry.count += 1;
        if let Some(msg) = cur.failure_message() {
            if entry.error_messages.len() < max_samples
                && !entry.error_messages.iter().any(|m| m == msg)
            {
                entry.error_messages.push(msg.to_string());
            }
        }
    }

    let mut out: Vec<ErrorPattern> = pairs
        .into_values()
        .filter(|p| p.count >= min_count)
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

// ---------------------------------------------------------------------------
// Time patterns
// ---------------------------------------------------------------------------

/// Hour-of-day and day-of-week peaks. Timestamps are bucketed in UTC.
pub fn detect_time_patterns(executions: &[ExecutionRecord]) -> Vec<TimePeak> {
    let mut hourly: HashMap<(&str, u32), u32> = HashMap::new();
    let mut daily: HashMap<(&str, u32), u32> = HashMap::new();

    for r in executions {
        *hourly.entry((r.command.as_str(), r.timestamp.hour())).or_default() += 1;
        *daily
            .entry((r.command.as_str(), r.timestamp.weekday().num_days_from_monday()))
            .or_default() += 1;
    }

    let mut peaks = find_peaks(&hourly, |hour| TimeBucket::HourOfDay { hour });
    peaks.extend(find_peaks(&daily, |day| TimeBucket::DayOfWeek {
        day: weekday_name(day).to_string(),
    }));
    peaks.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.command.cmp(&b.command)));
    peaks
}

fn find_peaks(
    buckets: &HashMap<(&str, u32), u32>,
    label: impl Fn(u32) -> TimeBucket,
) -> Vec<TimePeak> {
    if buckets.is_empty() {
        return Vec::new();
    }
    let total: u32 = buckets.values().sum();
    let mean = f64::from(total) / buckets.len() as f64;

    let mut peaks: Vec<TimePeak> = buckets
        .iter()
        .filter(|(_, &count)| f64::from(count) > 2.0 * mean)
        .map(|(&(command, slot), &count)| TimePeak {
            command: command.to_string(),
            bucket: label(slot),
            count,
            mean,
        })
        .collect();
    peaks.sort_by(|a, b| a.command.cmp(&b.command));
    peaks
}

fn weekday_name(days_from_monday: u32) -> &'static str {
    match days_from_monday {
        0 => "monday",
        1 => "tuesday",
        2 => "wednesday",
        3 => "thursday",
        4 => "friday",
        5 => "saturday",
        _ => "sunday",
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// `frequent` must already be sorted by descending frequency.
fn recommendations(frequent: &[FrequentPattern], config: &RecognizerConfig) -> Vec<Recommendation> {
    frequent
        .iter()
        .take(config.max_recommendations)
        .filter(|p| p.frequency >= config.recommendation_min_frequency)
        .map(|p| {
            let sequence = p.sequence();
            let name = p
                .suggestion
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| generate_suggestion(&sequence, p.frequency, None, config).name);
            Recommendation {
                message: format!(
                    "Create composite command {name} for {} (used {} times)",
                    sequence.describe(),
                    p.frequency
                ),
                suggested_name: name,
                frequency: p.frequency,
                commands: sequence,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
