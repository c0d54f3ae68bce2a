//! Pattern aggregation, scoring and composite-command suggestions.

use crate::config::RecognizerConfig;
use crate::sequence::{self, CandidateSequence};
use crate::types::{CommandSequence, ExecutionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound for every confidence value the engine reports.
pub const MAX_CONFIDENCE: f64 = 0.95;

// ---------------------------------------------------------------------------
// PatternSuggestion
// ---------------------------------------------------------------------------

/// Proposed composite command replacing a recurring sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSuggestion {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_saved_ms: Option<f64>,
    pub confidence: f64,
}

/// Build the composite-command suggestion for a sequence seen `count` times.
pub fn generate_suggestion(
    sequence: &CommandSequence,
    count: u32,
    mean_duration_ms: Option<f64>,
    config: &RecognizerConfig,
) -> PatternSuggestion {
    let slug = sequence
        .commands()
        .iter()
        .map(|c| c.trim_start_matches('/'))
        .collect::<Vec<_>>()
        .join("-");

    PatternSuggestion {
        name: format!("{}{}", config.composite_prefix, slug),
        description: format!("Runs {}", sequence.describe()),
        estimated_time_saved_ms: mean_duration_ms.map(|d| d * config.time_saved_ratio),
        confidence: (f64::from(count) / 10.0).min(MAX_CONFIDENCE),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Importance score of a pattern; never negative.
pub fn calculate_pattern_score(
    sequence: &CommandSequence,
    count: u32,
    avg_success_rate: f64,
    config: &RecognizerConfig,
) -> f64 {
    let length_bonus = sequence.len().saturating_sub(config.min_pattern_length) as f64 * 5.0;
    let high_traffic = sequence
        .commands()
        .iter()
        .filter(|c| config.is_high_traffic(c))
        .count() as f64;

    let score = f64::from(count) * 10.0 + avg_success_rate * 20.0 + length_bonus
        - config.high_traffic_penalty * high_traffic;
    score.max(0.0)
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "commands")]
    pub sequence: CommandSequence,
    pub count: u32,
    pub score: f64,
    pub avg_success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_errors: Vec<String>,
    pub suggestion: PatternSuggestion,
    #[serde(skip)]
    pub instances: Vec<CandidateSequence>,
}

impl Pattern {
    fn from_instances(
        sequence: CommandSequence,
        instances: Vec<CandidateSequence>,
        config: &RecognizerConfig,
    ) -> Self {
        let count = u32::try_from(instances.len()).unwrap_or(u32::MAX);
        let avg_success_rate = mean(instances.iter().map(|c| c.metadata.success_rate))
            .unwrap_or(0.0);
        let avg_duration_ms = mean(instances.iter().filter_map(|c| c.metadata.avg_duration_ms));
        let last_seen = instances
            .iter()
            .filter_map(|c| c.records.last().map(|r| r.timestamp))
            .max();

        let all_records: Vec<ExecutionRecord> = instances
            .iter()
            .flat_map(|c| c.records.iter().cloned())
            .collect();
        let common_parameters =
            sequence::common_parameters(&all_records, config.common_parameter_threshold);
        let common_errors = sequence::common_errors(&all_records, config.max_common_errors);

        let score = calculate_pattern_score(&sequence, count, avg_success_rate, config);
        let suggestion = generate_suggestion(&sequence, count, avg_duration_ms, config);

        Self {
            sequence,
            count,
            score,
            avg_success_rate,
            avg_duration_ms,
            last_seen,
            common_parameters,
            common_errors,
            suggestion,
            instances,
        }
    }

    pub fn key(&self) -> String {
        self.sequence.key()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Merge candidates by ordered command list, keep the frequent ones and sort
/// them by descending score.
pub fn aggregate_patterns(
    candidates: Vec<CandidateSequence>,
    config: &RecognizerConfig,
) -> Vec<Pattern> {
    let mut groups: BTreeMap<CommandSequence, Vec<CandidateSequence>> = BTreeMap::new();
    for candidate in candidates {
        groups
            .entry(candidate.sequence.clone())
            .or_default()
            .push(candidate);
    }

    let min = config.min_frequency as usize;
    let mut patterns: Vec<Pattern> = groups
        .into_iter()
        .filter(|(_, instances)| instances.len() >= min)
        .map(|(seq, instances)| Pattern::from_instances(seq, instances, config))
        .collect();

    if config.prune_subsumed {
        patterns = prune_subsumed(patterns);
    }

    patterns.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.sequence.cmp(&b.sequence))
    });
    patterns
}

/// Drop every pattern that is a contiguous run of a longer pattern occurring
/// at least as often.
pub fn prune_subsumed(patterns: Vec<Pattern>) -> Vec<Pattern> {
    let keep: Vec<bool> = patterns
        .iter()
        .map(|p| {
            !patterns.iter().any(|q| {
                q.sequence.len() > p.sequence.len()
                    && q.count >= p.count
                    && q.sequence.contains_run(&p.sequence)
            })
        })
        .collect();

    patterns
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::extract_candidates;
    use crate::session::group_into_sessions;
    use chrono::{Duration, TimeZone};

    fn seq(cmds: &[&str]) -> CommandSequence {
        CommandSequence::from(cmds.to_vec())
    }

    fn candidates_for(cmds: &[&str], config: &RecognizerConfig) -> Vec<CandidateSequence> {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let records = cmds
            .iter()
            .enumerate()
            .map(|(i, c)| {
                ExecutionRecord::success(*c, base + Duration::minutes(i as i64)).with_duration(1000)
            })
            .collect();
        group_into_sessions(records, config.session_timeout(), config.min_pattern_length)
            .iter()
            .flat_map(|s| extract_candidates(s, config))
            .collect()
    }

    #[test]
    fn score_formula() {
        let config = RecognizerConfig::default();
        // 3*10 + 1.0*20 + (3-2)*5 - 2*2 (/test and /commit are high traffic)
        let score = calculate_pattern_score(&seq(&["/fix", "/test", "/commit"]), 3, 1.0, &config);
        assert!((score - 51.0).abs() < 1e-9);
    }

    #[test]
    fn score_never_negative() {
        let config = RecognizerConfig {
            high_traffic_penalty: 100.0,
            ..Default::default()
        };
        let score = calculate_pattern_score(&seq(&["/test", "/commit"]), 0, 0.0, &config);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn score_monotonic_in_count() {
        let config = RecognizerConfig::default();
        let s = seq(&["/a", "/b", "/c"]);
        let mut last = -1.0;
        for count in 0..50 {
            let score = calculate_pattern_score(&s, count, 0.4, &config);
            assert!(score >= last);
            last = score;
        }
    }

    #[test]
    fn suggestion_shape() {
        let config = RecognizerConfig::default();
        let s = generate_suggestion(&seq(&["/fix", "/test", "/commit"]), 4, Some(1500.0), &config);
        assert_eq!(s.name, "/workflow:fix-test-commit");
        assert_eq!(s.description, "Runs /fix → /test → /commit");
        assert_eq!(s.estimated_time_saved_ms, Some(300.0));
        assert!((s.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn suggestion_confidence_is_capped() {
        let config = RecognizerConfig::default();
        let s = generate_suggestion(&seq(&["/a", "/b"]), 40, None, &config);
        assert_eq!(s.confidence, MAX_CONFIDENCE);
        assert_eq!(s.estimated_time_saved_ms, None);
    }

    #[test]
    fn repeated_triple_surfaces_one_pattern() {
        let config = RecognizerConfig::default();
        let cands = candidates_for(
            &["/fix", "/test", "/commit", "/fix", "/test", "/commit", "/fix", "/test", "/commit"],
            &config,
        );
        let patterns = aggregate_patterns(cands, &config);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].key(), "/fix,/test,/commit");
        assert_eq!(patterns[0].count, 3);
        assert_eq!(patterns[0].instances.len(), 3);
        assert_eq!(patterns[0].avg_duration_ms, Some(1000.0));
    }

    #[test]
    fn without_pruning_sub_runs_are_reported() {
        let config = RecognizerConfig {
            prune_subsumed: false,
            ..Default::default()
        };
        let cands = candidates_for(
            &["/fix", "/test", "/commit", "/fix", "/test", "/commit", "/fix", "/test", "/commit"],
            &config,
        );
        let keys: Vec<String> = aggregate_patterns(cands, &config)
            .iter()
            .map(|p| p.key())
            .collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"/fix,/test".to_string()));
        assert!(keys.contains(&"/test,/commit".to_string()));
        assert!(keys.contains(&"/fix,/test,/commit".to_string()));
    }

    #[test]
    fn more_frequent_sub_run_survives_pruning() {
        let config = RecognizerConfig::default();
        // /lint,/build occurs 4 times; every other frequent run sits inside
        // the 3-times /lint,/build,/ship,/lint,/build
        let cands = candidates_for(
            &[
                "/lint", "/build", "/ship", "/lint", "/build", "/ship", "/lint", "/build",
                "/ship", "/lint", "/build",
            ],
            &config,
        );
        let patterns = aggregate_patterns(cands, &config);
        let mut keys: Vec<String> = patterns.iter().map(|p| p.key()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "/lint,/build".to_string(),
                "/lint,/build,/ship,/lint,/build".to_string()
            ]
        );
        assert!(patterns.iter().all(|p| p.count >= 3));
    }

    #[test]
    fn identical_commands_never_form_patterns() {
        let config = RecognizerConfig::default();
        let cands = candidates_for(&["/fix"; 12], &config);
        assert!(aggregate_patterns(cands, &config).is_empty());
    }

    #[test]
    fn patterns_sorted_by_score() {
        let config = RecognizerConfig {
            prune_subsumed: false,
            ..Default::default()
        };
        let cands = candidates_for(
            &[
                "/a", "/b", "/c", "/a", "/b", "/c", "/a", "/b", "/c", "/a", "/b",
            ],
            &config,
        );
        let patterns = aggregate_patterns(cands, &config);
        for w in patterns.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }
}
