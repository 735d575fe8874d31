//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for UI
//! clients. It dispatches to `commands/*.rs`, parses loose inputs (JSON text,
//! file paths) into typed values and returns `Result<CmdResult>`.
//!
//! It does no business logic and no terminal I/O. Saving, loading and
//! recovery live in [`crate::persistence`]; rendering lives in the CLI.
//!
//! `FichaApi<S: KvStore, C: Clock>` is generic over the store and the clock:
//! the binary uses `FichaApi<FileKvStore>`, tests use `MemStore` with a
//! `FixedClock`.

use crate::clock::{Clock, SystemClock};
use crate::commands::{self, backups::BackupAction, config::ConfigAction, CmdResult, FichaPaths};
use crate::error::{FichaError, Result};
use crate::model::FormData;
use crate::persistence::{CleanupOptions, LoadOptions, Persistence, SaveOptions};
use crate::store::KvStore;
use std::path::Path;

pub use crate::commands::{CmdMessage, MessageLevel};

pub struct FichaApi<S: KvStore, C: Clock = SystemClock> {
    persistence: Persistence<S, C>,
    paths: FichaPaths,
}

impl<S: KvStore, C: Clock> FichaApi<S, C> {
    pub fn new(persistence: Persistence<S, C>, paths: FichaPaths) -> Self {
        Self { persistence, paths }
    }

    pub fn persistence(&self) -> &Persistence<S, C> {
        &self.persistence
    }

    /// Count a new session in the analytics record.
    pub fn start_session(&self) {
        self.persistence.analytics().init_session();
    }

    pub fn save(&self, data: &FormData, options: SaveOptions) -> Result<CmdResult> {
        commands::save::run(&self.persistence, data, options)
    }

    /// Save a form given as JSON text.
    pub fn save_json(&self, json: &str, options: SaveOptions) -> Result<CmdResult> {
        let value = serde_json::from_str(json)
            .map_err(|e| FichaError::InvalidPayload(format!("not valid JSON: {}", e)))?;
        let data = FormData::from_value(value)?;
        self.save(&data, options)
    }

    pub fn default_save_options(&self) -> SaveOptions {
        self.persistence.default_save_options()
    }

    pub fn load(&self, options: LoadOptions) -> Result<CmdResult> {
        commands::load::run(&self.persistence, options)
    }

    pub fn export(&self, path: &Path) -> Result<CmdResult> {
        commands::export::run(&self.persistence, path)
    }

    pub fn import(&self, path: &Path) -> Result<CmdResult> {
        commands::import::run(&self.persistence, path)
    }

    pub fn backups(&self, action: BackupAction) -> Result<CmdResult> {
        commands::backups::run(&self.persistence, action)
    }

    pub fn cleanup(&self, options: CleanupOptions) -> Result<CmdResult> {
        commands::cleanup::run(&self.persistence, options)
    }

    pub fn doctor(&self) -> Result<CmdResult> {
        commands::doctor::run(&self.persistence)
    }

    pub fn stats(&self) -> Result<CmdResult> {
        commands::stats::run(&self.persistence)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.paths, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::FichaConfig;
    use crate::store::memory::MemStore;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn api() -> FichaApi<MemStore, FixedClock> {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
        let persistence = Persistence::with_clock(MemStore::new(), FichaConfig::default(), clock);
        FichaApi::new(persistence, FichaPaths::new(PathBuf::from("/nonexistent")))
    }

    #[test]
    fn test_save_json_then_load() {
        let api = api();
        api.save_json(r#"{"cliente": {"nome": "ACME"}}"#, SaveOptions::default())
            .unwrap();
        let result = api.load(LoadOptions::default()).unwrap();
        assert_eq!(result.data.unwrap().len(), 1);
    }

    #[test]
    fn test_save_json_rejects_bad_input() {
        let api = api();
        assert!(matches!(
            api.save_json("{", SaveOptions::default()).unwrap_err(),
            FichaError::InvalidPayload(_)
        ));
        assert!(matches!(
            api.save_json("\"texto\"", SaveOptions::default()).unwrap_err(),
            FichaError::InvalidPayload(_)
        ));
    }

    #[test]
    fn test_start_session_counts() {
        let api = api();
        api.start_session();
        api.start_session();
        let result = api.stats().unwrap();
        assert_eq!(result.analytics.unwrap().sessions_count, 2);
    }

    #[test]
    fn test_backups_dispatch() {
        let api = api();
        let result = api.backups(BackupAction::List).unwrap();
        assert!(result.backups.is_empty());
    }

    #[test]
    fn test_doctor_dispatch() {
        let result = api().doctor().unwrap();
        assert!(result.integrity.is_some());
    }
}
