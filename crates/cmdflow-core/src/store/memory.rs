//! In-process execution store.

use super::{ExecutionStore, FrequentPattern, PatternStat};
use crate::error::{CmdflowError, Result};
use crate::types::ExecutionRecord;
use crate::window::TimeWindow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    executions: Mutex<Vec<ExecutionRecord>>,
    patterns: Mutex<BTreeMap<String, PatternStat>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `records`.
    pub fn with_executions(records: Vec<ExecutionRecord>) -> Self {
        Self {
            executions: Mutex::new(records),
            patterns: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
        m.lock()
            .map_err(|e| CmdflowError::Store(format!("memory store poisoned: {e}")))
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()> {
        Self::lock(&self.executions)?.push(record.clone());
        Ok(())
    }

    async fn executions_in_window(&self, window: &TimeWindow) -> Result<Vec<ExecutionRecord>> {
        let cutoff = window.cutoff(Utc::now());
        let mut records: Vec<ExecutionRecord> = Self::lock(&self.executions)?
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn record_pattern(&self, sequence_key: &str) -> Result<()> {
        let mut patterns = Self::lock(&self.patterns)?;
        let current = patterns.get(sequence_key).copied();
        patterns.insert(sequence_key.to_string(), PatternStat::bump(current, Utc::now()));
        Ok(())
    }

    async fn frequent_patterns(&self, min_frequency: u32) -> Result<Vec<FrequentPattern>> {
        Ok(Self::lock(&self.patterns)?
            .iter()
            .filter(|(_, stat)| stat.frequency >= min_frequency)
            .map(|(key, stat)| stat.into_frequent(key.clone()))
            .collect())
    }
}
