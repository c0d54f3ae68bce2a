//! Persistent execution store using redb.
//!
//! # Table design
//!
//! `EXECUTIONS` uses a 24-byte composite key:
//! ```text
//! [ timestamp_ms: u64 big-endian (8 bytes) | uuid: 16 bytes ]
//! ```
//! Big-endian timestamps make byte order equal chronological order, so a
//! window query is a single range scan from the cutoff key with no sorting.
//!
//! `PATTERNS` is keyed by the comma-joined sequence key and holds a JSON
//! `{frequency, last_seen}` counter.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::{ExecutionStore, FrequentPattern, PatternStat};
use crate::error::{CmdflowError, Result};
use crate::types::ExecutionRecord;
use crate::window::TimeWindow;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Key: 24-byte composite (timestamp_ms big-endian ++ uuid bytes)
/// Value: JSON-encoded ExecutionRecord
const EXECUTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("executions");

/// Key: sequence key, Value: JSON-encoded PatternStat
const PATTERNS: TableDefinition<&str, &[u8]> = TableDefinition::new("patterns");

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn execution_key(ts: DateTime<Utc>, id: Uuid) -> [u8; 24] {
    let mut key = [0u8; 24];
    let ms = ts.timestamp_millis().max(0) as u64;
    key[..8].copy_from_slice(&ms.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

/// Smallest key at or after `cutoff`; the zero UUID suffix sorts first.
fn window_lower_bound(cutoff: DateTime<Utc>) -> [u8; 24] {
    let mut key = [0u8; 24];
    let ms = cutoff.timestamp_millis().max(0) as u64;
    key[..8].copy_from_slice(&ms.to_be_bytes());
    key
}

fn db_err(e: impl std::fmt::Display) -> CmdflowError {
    CmdflowError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the redb database at `path`.
    ///
    /// Creates both tables if they don't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        // Ensure the tables exist before any reads
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(EXECUTIONS).map_err(db_err)?;
        wt.open_table(PATTERNS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    fn insert_execution(&self, record: &ExecutionRecord) -> Result<()> {
        let key = execution_key(record.timestamp, Uuid::new_v4());
        let value = serde_json::to_vec(record).map_err(db_err)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(EXECUTIONS).map_err(db_err)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Executions with `timestamp >= cutoff`, in timestamp order.
    fn range_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExecutionRecord>> {
        let lower = window_lower_bound(cutoff);
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(EXECUTIONS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.range(lower.as_slice()..).map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            match serde_json::from_slice::<ExecutionRecord>(v.value()) {
                Ok(record) => result.push(record),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable execution row"),
            }
        }
        Ok(result)
    }

    fn bump_pattern(&self, sequence_key: &str) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(PATTERNS).map_err(db_err)?;
            let current: Option<PatternStat> = match table.get(sequence_key).map_err(db_err)? {
                Some(guard) => Some(serde_json::from_slice(guard.value()).map_err(db_err)?),
                None => None,
            };
            let next = PatternStat::bump(current, Utc::now());
            let value = serde_json::to_vec(&next).map_err(db_err)?;
            table
                .insert(sequence_key, value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn list_patterns(&self, min_frequency: u32) -> Result<Vec<FrequentPattern>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(PATTERNS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            let stat: PatternStat = serde_json::from_slice(v.value()).map_err(db_err)?;
            if stat.frequency >= min_frequency {
                result.push(stat.into_frequent(k.value().to_string()));
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl ExecutionStore for RedbStore {
    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.insert_execution(record)
    }

    async fn executions_in_window(&self, window: &TimeWindow) -> Result<Vec<ExecutionRecord>> {
        self.range_since(window.cutoff(Utc::now()))
    }

    async fn record_pattern(&self, sequence_key: &str) -> Result<()> {
        self.bump_pattern(sequence_key)
    }

    async fn frequent_patterns(&self, min_frequency: u32) -> Result<Vec<FrequentPattern>> {
        self.list_patterns(min_frequency)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
