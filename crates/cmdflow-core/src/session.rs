//! Session segmentation: split a chronological execution log into bursts of
//! activity separated by idle gaps.

use crate::types::ExecutionRecord;
use chrono::Duration;

/// A maximal run of executions with no gap above the session timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    records: Vec<ExecutionRecord>,
}

impl Session {
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.command.as_str())
    }
}

/// Group executions into sessions.
///
/// Records are sorted by timestamp first (stable, so equal timestamps keep
/// their store order). A gap equal to `timeout` stays in the same session.
/// Sessions shorter than `min_len` are dropped.
pub fn group_into_sessions(
    mut records: Vec<ExecutionRecord>,
    timeout: Duration,
    min_len: usize,
) -> Vec<Session> {
    records.sort_by_key(|r| r.timestamp);

    let mut sessions = Vec::new();
    let mut current: Vec<ExecutionRecord> = Vec::new();

    for record in records {
        if let Some(prev) = current.last() {
            if record.timestamp - prev.timestamp > timeout {
                flush(&mut sessions, std::mem::take(&mut current), min_len);
            }
        }
        current.push(record);
    }
    flush(&mut sessions, current, min_len);

    sessions
}

fn flush(sessions: &mut Vec<Session>, records: Vec<ExecutionRecord>, min_len: usize) {
    if !records.is_empty() && records.len() >= min_len {
        sessions.push(Session { records });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(minute: i64, cmd: &str) -> ExecutionRecord {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        ExecutionRecord::success(cmd, base + Duration::minutes(minute))
    }

    fn thirty() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        assert!(group_into_sessions(vec![], thirty(), 2).is_empty());
    }

    #[test]
    fn single_record_is_discarded() {
        assert!(group_into_sessions(vec![at(0, "/fix")], thirty(), 2).is_empty());
    }

    #[test]
    fn gap_equal_to_timeout_stays_in_session() {
        let sessions = group_into_sessions(vec![at(0, "/a"), at(30, "/b")], thirty(), 2);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].len(), 2);
    }

    #[test]
    fn gap_above_timeout_splits() {
        let records = vec![at(0, "/a"), at(5, "/b"), at(36, "/c"), at(40, "/d")];
        let sessions = group_into_sessions(records, thirty(), 2);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].commands().collect::<Vec<_>>(), vec!["/a", "/b"]);
        assert_eq!(sessions[1].commands().collect::<Vec<_>>(), vec!["/c", "/d"]);
    }

    #[test]
    fn short_sessions_are_dropped() {
        let records = vec![at(0, "/a"), at(100, "/b"), at(101, "/c")];
        let sessions = group_into_sessions(records, thirty(), 2);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].commands().collect::<Vec<_>>(), vec!["/b", "/c"]);
    }

    #[test]
    fn unsorted_input_is_ordered_before_segmenting() {
        let records = vec![at(10, "/c"), at(0, "/a"), at(5, "/b")];
        let sessions = group_into_sessions(records, thirty(), 2);
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].commands().collect::<Vec<_>>(),
            vec!["/a", "/b", "/c"]
        );
    }

    #[test]
    fn no_session_shorter_than_two() {
        let records: Vec<_> = (0..40)
            .map(|i| at(i * i, if i % 2 == 0 { "/x" } else { "/y" }))
            .collect();
        for s in group_into_sessions(records, thirty(), 2) {
            assert!(s.len() >= 2);
        }
    }
}
