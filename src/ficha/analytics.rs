//! Usage analytics: a bounded action log plus per-action counters.
//!
//! Every operation here is best-effort. Failures are logged and swallowed so
//! that a broken analytics record can never fail a save or a load.

use crate::clock::Clock;
use crate::error::{FichaError, Result};
use crate::model::{ActionRecord, AnalyticsRecord};
use crate::store::KvStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

pub const MAX_ACTIONS: usize = 100;
pub const RECENT_ACTIONS: usize = 10;

/// Read-only summary of the analytics record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub session_id: String,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub sessions_count: u64,
    pub total_actions: usize,
    pub counters: BTreeMap<String, u64>,
    /// The retained log (at most [`MAX_ACTIONS`]), oldest first.
    pub actions: Vec<ActionRecord>,
}

impl AnalyticsReport {
    /// The last [`RECENT_ACTIONS`] entries, oldest first.
    pub fn recent_actions(&self) -> &[ActionRecord] {
        let skip = self.actions.len().saturating_sub(RECENT_ACTIONS);
        &self.actions[skip..]
    }
}

pub struct AnalyticsRecorder<'a, S: KvStore, C: Clock> {
    store: &'a S,
    key: &'a str,
    clock: &'a C,
}

impl<'a, S: KvStore, C: Clock> AnalyticsRecorder<'a, S, C> {
    pub fn new(store: &'a S, key: &'a str, clock: &'a C) -> Self {
        Self { store, key, clock }
    }

    fn read(&self) -> Result<Option<AnalyticsRecord>> {
        let Some(raw) = self.store.get(self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| FichaError::CorruptData(format!("analytics record: {}", e)))
    }

    fn write(&self, record: &AnalyticsRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.store.set(self.key, &raw)
    }

    fn fresh_record(&self) -> AnalyticsRecord {
        let now = self.clock.now();
        AnalyticsRecord {
            session_id: Uuid::new_v4().to_string(),
            first_access: now,
            last_access: now,
            sessions_count: 0,
            actions: Vec::new(),
            counters: BTreeMap::new(),
        }
    }

    /// The stored record, or a new one when absent or unreadable.
    fn load_or_new(&self) -> AnalyticsRecord {
        match self.read() {
            Ok(Some(record)) => record,
            Ok(None) => self.fresh_record(),
            Err(e) => {
                warn!(error = %e, "resetting analytics record");
                self.fresh_record()
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut AnalyticsRecord)) {
        let mut record = self.load_or_new();
        f(&mut record);
        record.last_access = self.clock.now();
        if let Err(e) = self.write(&record) {
            warn!(error = %e, "failed to persist analytics");
        }
    }

    /// Count one more session. The first call also assigns the session id.
    pub fn init_session(&self) {
        self.update(|record| record.sessions_count += 1);
    }

    pub fn record_action(&self, action: &str, data: Value) {
        let now = self.clock.now();
        self.update(|record| {
            record.actions.push(ActionRecord {
                action: action.to_string(),
                timestamp: now,
                data,
            });
            if record.actions.len() > MAX_ACTIONS {
                let excess = record.actions.len() - MAX_ACTIONS;
                record.actions.drain(..excess);
            }
            *record.counters.entry(action.to_string()).or_insert(0) += 1;
        });
    }

    /// The full retained action log, oldest first.
    pub fn actions(&self) -> Vec<ActionRecord> {
        match self.read() {
            Ok(Some(record)) => record.actions,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "analytics record unreadable");
                Vec::new()
            }
        }
    }

    pub fn report(&self) -> Option<AnalyticsReport> {
        let record = match self.read() {
            Ok(record) => record?,
            Err(e) => {
                warn!(error = %e, "analytics record unreadable");
                return None;
            }
        };
        Some(AnalyticsReport {
            session_id: record.session_id,
            first_access: record.first_access,
            last_access: record.last_access,
            sessions_count: record.sessions_count,
            total_actions: record.actions.len(),
            counters: record.counters,
            actions: record.actions,
        })
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(self.key) {
            warn!(error = %e, "failed to clear analytics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::memory::MemStore;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    const KEY: &str = "test_analytics";

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap())
    }

    #[test]
    fn test_no_report_before_first_use() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);
        assert_eq!(recorder.report(), None);
        assert!(recorder.actions().is_empty());
    }

    #[test]
    fn test_sessions_keep_id_and_count_up() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);

        recorder.init_session();
        let first = recorder.report().unwrap();
        assert_eq!(first.sessions_count, 1);

        clock.advance(Duration::hours(1));
        recorder.init_session();
        let second = recorder.report().unwrap();
        assert_eq!(second.sessions_count, 2);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.first_access, first.first_access);
        assert_eq!(second.last_access, clock.now());
    }

    #[test]
    fn test_action_log_is_capped_to_most_recent() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);

        for i in 0..150 {
            recorder.record_action("data_saved", json!({ "n": i }));
        }

        let actions = recorder.actions();
        assert_eq!(actions.len(), MAX_ACTIONS);
        assert_eq!(actions.first().unwrap().data, json!({"n": 50}));
        assert_eq!(actions.last().unwrap().data, json!({"n": 149}));

        let report = recorder.report().unwrap();
        assert_eq!(report.counters["data_saved"], 150);
        assert_eq!(report.actions, actions);
        assert_eq!(report.recent_actions().len(), RECENT_ACTIONS);
        assert_eq!(report.recent_actions()[0].data, json!({"n": 140}));
    }

    #[test]
    fn test_counters_per_action() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);
        recorder.record_action("data_saved", Value::Null);
        recorder.record_action("data_loaded", Value::Null);
        recorder.record_action("data_saved", Value::Null);

        let report = recorder.report().unwrap();
        assert_eq!(report.counters["data_saved"], 2);
        assert_eq!(report.counters["data_loaded"], 1);
        assert_eq!(report.sessions_count, 0);
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);
        store.set_simulate_write_error(true);

        recorder.init_session();
        recorder.record_action("data_saved", Value::Null);
        assert_eq!(recorder.report(), None);
    }

    #[test]
    fn test_corrupt_record_is_reset() {
        let store = MemStore::new();
        let clock = clock();
        store.set(KEY, "{broken").unwrap();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);

        assert_eq!(recorder.report(), None);
        recorder.record_action("data_loaded", Value::Null);
        assert_eq!(recorder.report().unwrap().total_actions, 1);
    }

    #[test]
    fn test_clear() {
        let store = MemStore::new();
        let clock = clock();
        let recorder = AnalyticsRecorder::new(&store, KEY, &clock);
        recorder.init_session();
        recorder.clear();
        assert_eq!(store.get(KEY).unwrap(), None);
    }
}
