//! The pattern recognizer: batch detection, real-time suggestions and
//! insights on top of an [`ExecutionStore`].
//!
//! ```text
//! executions_in_window ─▶ group_into_sessions ─▶ extract_candidates
//!                                                       │
//!            record_pattern ◀── aggregate_patterns ◀────┘
//! ```
//!
//! The recognizer keeps no state between calls. Store errors are returned
//! as-is; there are no retries.

use crate::config::RecognizerConfig;
use crate::error::{CmdflowError, Result};
use crate::insights::{self, InsightsReport};
use crate::pattern::{self, Pattern, PatternSuggestion, MAX_CONFIDENCE};
use crate::sequence::extract_candidates;
use crate::session::group_into_sessions;
use crate::store::ExecutionStore;
use crate::types::CommandSequence;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Query / result types
// ---------------------------------------------------------------------------

/// What the user has just run, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionContext {
    pub recent_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_command: Option<String>,
}

impl SuggestionContext {
    pub fn new(recent_commands: Vec<String>, current_command: Option<String>) -> Self {
        Self {
            recent_commands,
            current_command,
        }
    }

    fn sequence(&self) -> Vec<String> {
        let mut seq = self.recent_commands.clone();
        if let Some(cur) = &self.current_command {
            seq.push(cur.clone());
        }
        seq
    }
}

/// Commands that usually follow the current context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub pattern: CommandSequence,
    pub next_commands: Vec<String>,
    pub confidence: f64,
    pub frequency: u32,
}

/// Exact hit of a stored frequent pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: CommandSequence,
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
    pub suggestion: PatternSuggestion,
}

/// Confidence that a stored pattern continues the given context.
pub fn suggestion_confidence(frequency: u32, context_len: usize) -> f64 {
    let freq_boost = (f64::from(frequency) / 20.0).min(0.3);
    let context_boost = (context_len as f64 / 10.0) * 0.2;
    (0.5 + freq_boost + context_boost).min(MAX_CONFIDENCE)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PatternRecognizerBuilder {
    store: Option<Arc<dyn ExecutionStore>>,
    config: RecognizerConfig,
}

impl PatternRecognizerBuilder {
    pub fn store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails with `Configuration` when no store was supplied or the config
    /// has error-level problems.
    pub fn build(self) -> Result<PatternRecognizer> {
        let store = self.store.ok_or_else(|| {
            CmdflowError::Configuration("pattern recognizer requires an execution store".into())
        })?;
        self.config.ensure_valid()?;
        Ok(PatternRecognizer {
            store,
            config: self.config,
        })
    }
}

// ---------------------------------------------------------------------------
// PatternRecognizer
// ---------------------------------------------------------------------------

pub struct PatternRecognizer {
    store: Arc<dyn ExecutionStore>,
    config: RecognizerConfig,
}

impl PatternRecognizer {
    pub fn builder() -> PatternRecognizerBuilder {
        PatternRecognizerBuilder::default()
    }

    /// Recognizer with the default configuration.
    pub fn new(store: Arc<dyn ExecutionStore>) -> Result<Self> {
        Self::builder().store(store).build()
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Detect frequent command sequences in the executions of `window`
    /// (e.g. `"7d"`) and record each surfaced pattern in the store.
    pub async fn detect_patterns(&self, window: &str) -> Result<Vec<Pattern>> {
        let window: TimeWindow = window.parse()?;
        self.detect_patterns_in(&window).await
    }

    /// [`detect_patterns`](Self::detect_patterns) over the configured default window.
    pub async fn detect_recent_patterns(&self) -> Result<Vec<Pattern>> {
        let window = self.config.default_window;
        self.detect_patterns_in(&window).await
    }

    pub async fn detect_patterns_in(&self, window: &TimeWindow) -> Result<Vec<Pattern>> {
        let executions = self.store.executions_in_window(window).await?;
        let total = executions.len();

        let sessions = group_into_sessions(
            executions,
            self.config.session_timeout(),
            self.config.min_pattern_length,
        );
        let candidates: Vec<_> = sessions
            .iter()
            .flat_map(|s| extract_candidates(s, &self.config))
            .collect();
        tracing::debug!(
            executions = total,
            sessions = sessions.len(),
            candidates = candidates.len(),
            "segmented execution log"
        );

        let patterns = pattern::aggregate_patterns(candidates, &self.config);

        // Writes are independent; no ordering between them is required.
        try_join_all(
            patterns
                .iter()
                .map(|p| async move { self.store.record_pattern(&p.key()).await }),
        )
        .await?;

        tracing::info!(window = %window, patterns = patterns.len(), "pattern detection finished");
        Ok(patterns)
    }

    /// Suggest what usually comes next after `ctx`, most confident first.
    pub async fn suggest_commands(&self, ctx: &SuggestionContext) -> Result<Vec<Suggestion>> {
        let context = ctx.sequence();
        if context.is_empty() {
            return Ok(Vec::new());
        }

        let stored = self.store.frequent_patterns(self.config.min_frequency).await?;
        let mut suggestions: Vec<Suggestion> = stored
            .into_iter()
            .filter(|p| p.frequency >= self.config.min_frequency)
            .filter_map(|p| {
                let seq = p.sequence();
                if seq.len() <= context.len() || !seq.starts_with(&context) {
                    return None;
                }
                Some(Suggestion {
                    next_commands: seq.commands()[context.len()..].to_vec(),
                    confidence: suggestion_confidence(p.frequency, context.len()),
                    frequency: p.frequency,
                    pattern: seq,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        Ok(suggestions)
    }

    /// Exact lookup of `recent_commands` among stored frequent patterns.
    pub async fn check_for_pattern(&self, recent_commands: &[String]) -> Result<Option<PatternMatch>> {
        if recent_commands.len() < self.config.min_pattern_length {
            return Ok(None);
        }

        let wanted = CommandSequence::new(recent_commands.to_vec());
        let stored = self.store.frequent_patterns(self.config.min_frequency).await?;
        let Some(hit) = stored
            .into_iter()
            .find(|p| p.frequency >= self.config.min_frequency && p.sequence() == wanted)
        else {
            return Ok(None);
        };

        let suggestion = hit.suggestion.clone().unwrap_or_else(|| {
            pattern::generate_suggestion(&wanted, hit.frequency, None, &self.config)
        });
        Ok(Some(PatternMatch {
            pattern: wanted,
            frequency: hit.frequency,
            last_seen: hit.last_seen,
            suggestion,
        }))
    }

    /// Frequent-pattern summary plus error and time-of-use analytics over
    /// the configured insights window.
    pub async fn get_pattern_insights(&self) -> Result<InsightsReport> {
        let frequent = self.store.frequent_patterns(self.config.min_frequency).await?;
        let frequent = frequent
            .into_iter()
            .filter(|p| p.frequency >= self.config.min_frequency)
            .collect();
        let mut executions = self
            .store
            .executions_in_window(&self.config.insights_window)
            .await?;
        executions.sort_by_key(|r| r.timestamp);

        Ok(insights::build_report(frequent, &executions, &self.config))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FrequentPattern, MemoryStore};
    use crate::types::ExecutionRecord;
    use async_trait::async_trait;
    use chrono::Duration;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Executions one minute apart, ending a few minutes ago.
    fn log(cmds: &[&str]) -> Vec<ExecutionRecord> {
        let start = Utc::now() - Duration::minutes(cmds.len() as i64 + 5);
        cmds.iter()
            .enumerate()
            .map(|(i, c)| ExecutionRecord::success(*c, start + Duration::minutes(i as i64)))
            .collect()
    }

    fn recognizer(store: Arc<MemoryStore>) -> PatternRecognizer {
        PatternRecognizer::new(store).unwrap()
    }

    struct BrokenStore;

    #[async_trait]
    impl ExecutionStore for BrokenStore {
        async fn record_execution(&self, _: &ExecutionRecord) -> Result<()> {
            Err(CmdflowError::Store("disk on fire".into()))
        }
        async fn executions_in_window(&self, _: &TimeWindow) -> Result<Vec<ExecutionRecord>> {
            Err(CmdflowError::Store("disk on fire".into()))
        }
        async fn record_pattern(&self, _: &str) -> Result<()> {
            Err(CmdflowError::Store("disk on fire".into()))
        }
        async fn frequent_patterns(&self, _: u32) -> Result<Vec<FrequentPattern>> {
            Err(CmdflowError::Store("disk on fire".into()))
        }
    }

    #[test]
    fn build_without_store_is_configuration_error() {
        let err = PatternRecognizer::builder().build().err().unwrap();
        assert!(matches!(err, CmdflowError::Configuration(_)));
    }

    #[test]
    fn build_with_invalid_config_is_configuration_error() {
        let config = RecognizerConfig {
            max_pattern_length: 1,
            ..Default::default()
        };
        let result = PatternRecognizer::builder()
            .store(Arc::new(MemoryStore::new()))
            .config(config)
            .build();
        assert!(matches!(result, Err(CmdflowError::Configuration(_))));
    }

    #[test]
    fn confidence_formula() {
        // 0.5 + min(0.3, 3/20) + (2/10)*0.2
        assert!((suggestion_confidence(3, 2) - 0.69).abs() < 1e-9);
        assert_eq!(suggestion_confidence(100, 20), MAX_CONFIDENCE);
    }

    #[tokio::test]
    async fn detects_repeated_workflow_once() {
        let store = Arc::new(MemoryStore::with_executions(log(&[
            "/fix", "/test", "/commit", "/fix", "/test", "/commit", "/fix", "/test", "/commit",
        ])));
        let patterns = recognizer(store.clone()).detect_patterns("1d").await.unwrap();

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].sequence.commands(), strings(&["/fix", "/test", "/commit"]).as_slice());
        assert_eq!(patterns[0].count, 3);

        let stored = store.frequent_patterns(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sequence_key, "/fix,/test,/commit");
    }

    #[tokio::test]
    async fn degenerate_log_yields_nothing() {
        let store = Arc::new(MemoryStore::with_executions(log(&["/fix"; 15])));
        let patterns = recognizer(store.clone()).detect_patterns("7d").await.unwrap();
        assert!(patterns.is_empty());
        assert!(store.frequent_patterns(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_log_yields_nothing() {
        let store = Arc::new(MemoryStore::new());
        assert!(recognizer(store).detect_patterns("7d").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn executions_outside_window_are_ignored() {
        let old_start = Utc::now() - Duration::days(3);
        let records: Vec<_> = ["/a", "/b", "/a", "/b", "/c", "/a", "/b", "/c", "/a", "/b"]
            .iter()
            .enumerate()
            .map(|(i, c)| ExecutionRecord::success(*c, old_start + Duration::minutes(i as i64)))
            .collect();
        let store = Arc::new(MemoryStore::with_executions(records));
        let r = recognizer(store);
        assert!(r.detect_patterns("1d").await.unwrap().is_empty());
        assert!(!r.detect_patterns("7d").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_window_is_rejected() {
        let r = recognizer(Arc::new(MemoryStore::new()));
        assert!(matches!(
            r.detect_patterns("forever").await,
            Err(CmdflowError::InvalidWindow(_))
        ));
    }

    #[tokio::test]
    async fn all_detected_patterns_meet_min_frequency() {
        let store = Arc::new(MemoryStore::with_executions(log(&[
            "/a", "/b", "/c", "/d", "/a", "/b", "/e", "/a", "/b", "/c", "/d", "/a", "/b", "/c",
            "/d", "/e", "/c", "/d",
        ])));
        let patterns = recognizer(store).detect_patterns("1d").await.unwrap();
        assert!(!patterns.is_empty());
        assert!(patterns.iter().all(|p| p.count >= 3));
    }

    #[tokio::test]
    async fn suggests_remaining_commands() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            store.record_pattern("/fix,/test,/commit").await.unwrap();
        }
        let ctx = SuggestionContext::new(strings(&["/fix"]), Some("/test".into()));
        let suggestions = recognizer(store).suggest_commands(&ctx).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].next_commands, strings(&["/commit"]));
        assert!((suggestions[0].confidence - 0.69).abs() < 1e-9);
    }

    #[tokio::test]
    async fn full_match_gives_no_suggestion() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            store.record_pattern("/fix,/test").await.unwrap();
        }
        let ctx = SuggestionContext::new(strings(&["/fix", "/test"]), None);
        assert!(recognizer(store).suggest_commands(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn infrequent_patterns_are_not_suggested() {
        let store = Arc::new(MemoryStore::new());
        store.record_pattern("/fix,/test,/commit").await.unwrap();
        let ctx = SuggestionContext::new(strings(&["/fix"]), None);
        assert!(recognizer(store).suggest_commands(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggestions_sorted_and_shorter_than_pattern() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            store.record_pattern("/fix,/test").await.unwrap();
        }
        for _ in 0..8 {
            store.record_pattern("/fix,/lint,/commit").await.unwrap();
        }
        store.record_pattern("/test,/fix").await.unwrap();
        let ctx = SuggestionContext::new(strings(&["/fix"]), None);
        let suggestions = recognizer(store).suggest_commands(&ctx).await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].next_commands, strings(&["/lint", "/commit"]));
        for s in &suggestions {
            assert!(s.pattern.len() > 1);
            assert!(s.confidence <= MAX_CONFIDENCE);
        }
        assert!(suggestions[0].confidence >= suggestions[1].confidence);
    }

    #[tokio::test]
    async fn empty_context_gives_no_suggestions() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            store.record_pattern("/fix,/test").await.unwrap();
        }
        let ctx = SuggestionContext::default();
        assert!(recognizer(store).suggest_commands(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_for_pattern_is_exact() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..4 {
            store.record_pattern("/fix,/test,/commit").await.unwrap();
        }
        let r = recognizer(store);

        let hit = r
            .check_for_pattern(&strings(&["/fix", "/test", "/commit"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.frequency, 4);
        assert_eq!(hit.suggestion.name, "/workflow:fix-test-commit");

        assert!(r
            .check_for_pattern(&strings(&["/fix", "/test"]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn check_for_short_sequence_is_no_match() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            store.record_pattern("/fix").await.unwrap();
        }
        let r = recognizer(store);
        assert!(r.check_for_pattern(&strings(&["/fix"])).await.unwrap().is_none());
        assert!(r.check_for_pattern(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insights_report_error_pairs() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_executions(vec![
            ExecutionRecord::success("/setup", now - Duration::minutes(4)),
            ExecutionRecord::failure("/deploy", now - Duration::minutes(3), Some("denied".into())),
            ExecutionRecord::success("/setup", now - Duration::minutes(2)),
            ExecutionRecord::failure("/deploy", now - Duration::minutes(1), Some("denied".into())),
        ]));
        let report = recognizer(store).get_pattern_insights().await.unwrap();
        assert_eq!(report.error_patterns.len(), 1);
        assert_eq!(report.error_patterns[0].trigger_command, "/setup");
        assert_eq!(report.error_patterns[0].failure_command, "/deploy");
        assert_eq!(report.error_patterns[0].count, 2);
        assert_eq!(report.total_patterns, 0);
    }

    #[tokio::test]
    async fn store_errors_propagate_verbatim() {
        let r = PatternRecognizer::new(Arc::new(BrokenStore)).unwrap();
        let err = r.detect_patterns("7d").await.unwrap_err();
        assert!(matches!(err, CmdflowError::Store(ref m) if m == "disk on fire"));
        assert!(r.get_pattern_insights().await.is_err());
        let ctx = SuggestionContext::new(strings(&["/fix"]), None);
        assert!(r.suggest_commands(&ctx).await.is_err());
        assert!(r
            .check_for_pattern(&strings(&["/a", "/b"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn commands_containing_delimiter_keep_identity() {
        let store = Arc::new(MemoryStore::with_executions(log(&[
            "/x", "/a,b", "/y", "/x", "/a,b", "/y", "/x", "/a,b", "/y",
        ])));
        let r = recognizer(store.clone());
        for _ in 0..3 {
            r.detect_patterns("1d").await.unwrap();
        }

        let stored = store.frequent_patterns(3).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sequence().commands(), strings(&["/x", "/a,b", "/y"]).as_slice());

        let hit = r
            .check_for_pattern(&strings(&["/x", "/a,b", "/y"]))
            .await
            .unwrap();
        assert_eq!(hit.map(|m| m.frequency), Some(3));

        let ctx = SuggestionContext::new(strings(&["/x"]), None);
        let suggestions = r.suggest_commands(&ctx).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].next_commands, strings(&["/a,b", "/y"]));
    }

    #[tokio::test]
    async fn detect_then_suggest_roundtrip() {
        let store = Arc::new(MemoryStore::with_executions(log(&[
            "/fix", "/test", "/commit", "/fix", "/test", "/commit", "/fix", "/test", "/commit",
        ])));
        let r = recognizer(store);
        for _ in 0..3 {
            r.detect_patterns("1d").await.unwrap();
        }
        let ctx = SuggestionContext::new(strings(&["/fix"]), None);
        let suggestions = r.suggest_commands(&ctx).await.unwrap();
        assert_eq!(suggestions[0].next_commands, strings(&["/test", "/commit"]));
    }
}
