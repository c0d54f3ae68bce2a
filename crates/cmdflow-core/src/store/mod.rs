//! Execution store abstraction.
//!
//! The recognizer never owns the execution log; it reads and writes through
//! an [`ExecutionStore`] handed to it at construction. Two implementations
//! ship with the crate:
//!
//! - [`MemoryStore`]: process-local, used by tests and embedders.
//! - [`RedbStore`]: persistent single-file store used by the CLI.

pub mod db;
pub mod memory;

pub use db::RedbStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::pattern::PatternSuggestion;
use crate::types::{CommandSequence, ExecutionRecord};
use crate::window::TimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored pattern with its running frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentPattern {
    pub sequence_key: String,
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
    /// Suggestion persisted alongside the pattern, if the store keeps one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<PatternSuggestion>,
}

impl FrequentPattern {
    pub fn sequence(&self) -> CommandSequence {
        CommandSequence::from_key(&self.sequence_key)
    }
}

/// Running counter kept per sequence key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct PatternStat {
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
}

impl PatternStat {
    pub(crate) fn bump(current: Option<PatternStat>, now: DateTime<Utc>) -> PatternStat {
        match current {
            Some(stat) => PatternStat {
                frequency: stat.frequency.saturating_add(1),
                last_seen: now,
            },
            None => PatternStat {
                frequency: 1,
                last_seen: now,
            },
        }
    }

    pub(crate) fn into_frequent(self, key: String) -> FrequentPattern {
        FrequentPattern {
            sequence_key: key,
            frequency: self.frequency,
            last_seen: self.last_seen,
            suggestion: None,
        }
    }
}

/// Storage collaborator of the recognizer.
///
/// Failures are reported as `CmdflowError::Store` and are never retried by
/// the engine.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Append one finished execution to the log.
    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()>;

    /// Executions inside `window`, oldest first.
    async fn executions_in_window(&self, window: &TimeWindow) -> Result<Vec<ExecutionRecord>>;

    /// Increment the frequency of `sequence_key`, inserting it at 1 if new.
    async fn record_pattern(&self, sequence_key: &str) -> Result<()>;

    /// Stored patterns with `frequency >= min_frequency`.
    async fn frequent_patterns(&self, min_frequency: u32) -> Result<Vec<FrequentPattern>>;
}
