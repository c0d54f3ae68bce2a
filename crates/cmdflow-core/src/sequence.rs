//! Candidate subsequence extraction and per-candidate metadata.

use crate::config::RecognizerConfig;
use crate::session::Session;
use crate::types::{CommandSequence, ExecutionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceMetadata {
    /// Fraction of executions in the slice that succeeded.
    pub success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<f64>,
    /// `key:value` pairs shared by enough executions of the slice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_parameters: Vec<String>,
    /// Most frequent words of the failure messages, most frequent first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_errors: Vec<String>,
}

/// One concrete occurrence of a subsequence inside a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSequence {
    pub sequence: CommandSequence,
    /// Offset of the first record inside its session.
    pub start: usize,
    pub records: Vec<ExecutionRecord>,
    pub metadata: SequenceMetadata,
}

// ---------------------------------------------------------------------------
// Interestingness filter
// ---------------------------------------------------------------------------

/// Reject degenerate (all identical) and ping-pong (A,B,A,B,...) runs.
pub fn is_interesting(commands: &[&str]) -> bool {
    let Some(first) = commands.first() else {
        return false;
    };
    if commands.iter().all(|c| c == first) {
        return false;
    }

    if commands.len() >= 4 {
        let distinct: HashSet<&str> = commands.iter().copied().collect();
        let alternates = commands.windows(2).all(|w| w[0] != w[1]);
        if distinct.len() == 2 && alternates {
            return false;
        }
    }

    true
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Enumerate every accepted contiguous subsequence of `session` whose length
/// lies in `[min_pattern_length, max_pattern_length]`.
pub fn extract_candidates(session: &Session, config: &RecognizerConfig) -> Vec<CandidateSequence> {
    let records = session.records();
    let max_len = config.max_pattern_length.min(records.len());
    let mut out = Vec::new();

    for len in config.min_pattern_length..=max_len {
        for start in 0..=(records.len() - len) {
            let slice = &records[start..start + len];
            let commands: Vec<&str> = slice.iter().map(|r| r.command.as_str()).collect();
            if !is_interesting(&commands) {
                continue;
            }
            out.push(CandidateSequence {
                sequence: CommandSequence::new(commands.iter().map(|c| c.to_string()).collect()),
                start,
                records: slice.to_vec(),
                metadata: compute_metadata(slice, config),
            });
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

pub fn compute_metadata(records: &[ExecutionRecord], config: &RecognizerConfig) -> SequenceMetadata {
    SequenceMetadata {
        success_rate: success_rate(records),
        avg_duration_ms: average_duration(records),
        common_parameters: common_parameters(records, config.common_parameter_threshold),
        common_errors: common_errors(records, config.max_common_errors),
    }
}

pub fn success_rate(records: &[ExecutionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let ok = records.iter().filter(|r| r.outcome.is_success()).count();
    ok as f64 / records.len() as f64
}

pub fn average_duration(records: &[ExecutionRecord]) -> Option<f64> {
    // Durations span the full u64 range; sum in f64.
    let durations: Vec<f64> = records
        .iter()
        .filter_map(|r| r.duration_ms)
        .map(|d| d as f64)
        .collect();
    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<f64>() / durations.len() as f64)
}

/// Pairs present in at least `threshold` of all records. Records with
/// unparsable parameters count as having none.
pub fn common_parameters(records: &[ExecutionRecord], threshold: f64) -> Vec<String> {
    if records.is_empty() {
        return Vec::new();
    }
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let params = match record.parameters() {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "skipping parameters of malformed record");
                continue;
            }
        };
        for (key, value) in params {
            *counts.entry(format!("{key}:{value}")).or_default() += 1;
        }
    }

    let needed = threshold * records.len() as f64;
    counts
        .into_iter()
        .filter(|(_, n)| *n as f64 >= needed)
        .map(|(pair, _)| pair)
        .collect()
}

/// Top `limit` words longer than three characters across failure messages.
pub fn common_errors(records: &[ExecutionRecord], limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for message in records.iter().filter_map(|r| r.failure_message()) {
        for word in message.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.chars().count() > 3 {
                *counts.entry(word).or_default() += 1;
            }
        }
    }
    rank_words(counts, limit)
}

pub(crate) fn rank_words(counts: HashMap<String, usize>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
