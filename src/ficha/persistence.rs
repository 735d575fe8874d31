//! # Persistence Facade
//!
//! [`Persistence`] owns the store handle and orchestrates the components:
//!
//! ```text
//! save:  serialize -> backup live slot -> compress -> metadata -> write data -> write metadata -> analytics
//! load:  read data -> metadata / checksum -> decompress -> migrate (and persist) | staleness -> analytics
//!                              \__ corrupt or stale: restore latest backup (if allowed) or fail
//! ```
//!
//! ## Outcomes vs. Errors
//!
//! Expected states are values: an empty store loads as [`LoadOutcome::Empty`],
//! a recovery from backup as [`LoadOutcome::Recovered`]. Everything else is a
//! [`FichaError`]. UI callers wanting a flat `{success, error}` shape can use
//! [`StatusReport::from_result`].
//!
//! ## Write Ordering
//!
//! Data is written before metadata. There is no multi-key transaction: if the
//! process dies between the two writes, the next load sees a checksum mismatch
//! and takes the backup fallback path. Failed saves are not rolled back.

use crate::analytics::AnalyticsRecorder;
use crate::backup::{BackupRing, RestoreOutcome};
use crate::checksum::{build_metadata, default_user_agent, fingerprint};
use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::config::FichaConfig;
use crate::error::{FichaError, Result};
use crate::migration::MigrationRegistry;
use crate::model::{BackupEntry, FormData, Metadata};
use crate::store::{KvStore, StorageKeys};
use chrono::Duration;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub create_backup: bool,
    pub compress: bool,
    pub update_analytics: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            create_backup: true,
            compress: true,
            update_analytics: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub auto_migrate: bool,
    pub fallback_to_backup: bool,
    pub update_analytics: bool,
    /// Compare the stored checksum with the stored data.
    pub verify_checksum: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            auto_migrate: true,
            fallback_to_backup: true,
            update_analytics: true,
            verify_checksum: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    pub remove_backups: bool,
    pub remove_analytics: bool,
    pub remove_all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub metadata: Metadata,
    /// Snapshot of the previous live slot, when one was taken.
    pub backup: Option<BackupEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing has been saved yet.
    Empty,
    Loaded {
        data: FormData,
        metadata: Metadata,
    },
    /// Stored data was at an older schema version and has been rewritten.
    Migrated {
        data: FormData,
        from_version: String,
        metadata: Metadata,
    },
    /// Live data was corrupt or stale; the latest backup was promoted.
    Recovered {
        data: FormData,
        backup_id: i64,
        reason: String,
    },
}

impl LoadOutcome {
    pub fn data(&self) -> Option<&FormData> {
        match self {
            LoadOutcome::Empty => None,
            LoadOutcome::Loaded { data, .. }
            | LoadOutcome::Migrated { data, .. }
            | LoadOutcome::Recovered { data, .. } => Some(data),
        }
    }

    pub fn into_data(self) -> Option<FormData> {
        match self {
            LoadOutcome::Empty => None,
            LoadOutcome::Loaded { data, .. }
            | LoadOutcome::Migrated { data, .. }
            | LoadOutcome::Recovered { data, .. } => Some(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoredBackup {
    pub entry: BackupEntry,
    pub data: FormData,
    pub safety_backup: Option<BackupEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_keys: Vec<String>,
    pub pruned_backups: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub backup_count: usize,
    pub usage_bytes: usize,
    pub quota_bytes: usize,
}

impl IntegrityReport {
    pub fn usage_percent(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 0.0;
        }
        self.usage_bytes as f64 / self.quota_bytes as f64 * 100.0
    }
}

/// Flat `{success, error}` view of an operation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

const USAGE_WARNING_PERCENT: f64 = 80.0;

pub struct Persistence<S: KvStore, C: Clock = SystemClock> {
    store: S,
    keys: StorageKeys,
    config: FichaConfig,
    migrations: MigrationRegistry,
    clock: C,
    user_agent: String,
}

impl<S: KvStore> Persistence<S, SystemClock> {
    pub fn new(store: S, config: FichaConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: KvStore, C: Clock> Persistence<S, C> {
    pub fn with_clock(store: S, config: FichaConfig, clock: C) -> Self {
        Self {
            store,
            keys: config.storage_keys(),
            config,
            migrations: MigrationRegistry::default(),
            clock,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn config(&self) -> &FichaConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn migrations(&self) -> &MigrationRegistry {
        &self.migrations
    }

    pub fn backups(&self) -> BackupRing<'_, S, C> {
        BackupRing::new(
            &self.store,
            &self.keys,
            &self.clock,
            self.config.backup_capacity,
        )
    }

    pub fn analytics(&self) -> AnalyticsRecorder<'_, S, C> {
        AnalyticsRecorder::new(&self.store, &self.keys.analytics, &self.clock)
    }

    /// Save options honouring the configured compression default.
    pub fn default_save_options(&self) -> SaveOptions {
        SaveOptions {
            compress: self.config.compress,
            ..SaveOptions::default()
        }
    }

    pub fn save(&self, data: &FormData, options: SaveOptions) -> Result<SaveReport> {
        let value = serde_json::to_value(data)?;

        let backup = if options.create_backup {
            self.backups().create_backup()?
        } else {
            None
        };

        let (stored_value, compressed) = if options.compress {
            let envelope = codec::compress(&value);
            let compressed = codec::is_compressed(&envelope) && envelope != value;
            (envelope, compressed)
        } else {
            (value, false)
        };

        let stored = serde_json::to_string(&stored_value)?;
        let metadata = build_metadata(&stored, compressed, self.clock.now(), &self.user_agent);
        let metadata_raw = serde_json::to_string(&metadata)?;

        self.store
            .set(&self.keys.data, &stored)
            .map_err(|e| FichaError::StorageWrite(e.to_string()))?;
        self.store
            .set(&self.keys.metadata, &metadata_raw)
            .map_err(|e| FichaError::StorageWrite(e.to_string()))?;

        info!(
            size = metadata.size,
            compressed,
            sections = data.len(),
            "form data saved"
        );

        if options.update_analytics {
            self.analytics().record_action(
                "data_saved",
                json!({
                    "size": metadata.size,
                    "compressed": compressed,
                    "sections": data.len(),
                    "backup": backup.as_ref().map(|b| b.id),
                }),
            );
        }

        Ok(SaveReport { metadata, backup })
    }

    pub fn load(&self, options: LoadOptions) -> Result<LoadOutcome> {
        let Some(raw) = self.store.get(&self.keys.data)? else {
            debug!("no stored data");
            return Ok(LoadOutcome::Empty);
        };

        let outcome = match self.read_live(&raw, &options) {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable_by_backup() => {
                if !options.fallback_to_backup {
                    return Err(e);
                }
                warn!(error = %e, "live data unusable, restoring latest backup");
                let (entry, data) = self.backups().recover_latest_with(decode_entry)?;
                LoadOutcome::Recovered {
                    data,
                    backup_id: entry.id,
                    reason: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        if options.update_analytics {
            let (action, detail) = match &outcome {
                LoadOutcome::Empty => ("data_loaded", Value::Null),
                LoadOutcome::Loaded { metadata, .. } => {
                    ("data_loaded", json!({ "size": metadata.size }))
                }
                LoadOutcome::Migrated { from_version, .. } => {
                    ("data_migrated", json!({ "from": from_version }))
                }
                LoadOutcome::Recovered {
                    backup_id, reason, ..
                } => (
                    "data_recovered",
                    json!({ "backup": backup_id, "reason": reason }),
                ),
            };
            self.analytics().record_action(action, detail);
        }

        Ok(outcome)
    }

    fn read_live(&self, raw: &str, options: &LoadOptions) -> Result<LoadOutcome> {
        let metadata = self
            .read_metadata()?
            .ok_or_else(|| FichaError::CorruptData("metadata is missing".to_string()))?;

        if options.verify_checksum && fingerprint(raw) != metadata.checksum {
            return Err(FichaError::CorruptData(
                "checksum does not match stored data".to_string(),
            ));
        }

        let value: Value = serde_json::from_str(raw)
            .map_err(|e| FichaError::CorruptData(format!("stored data: {}", e)))?;
        let value = if metadata.compressed {
            unwrap_envelope(value).map_err(|reason| {
                FichaError::CorruptData(format!("stored data: {}", reason))
            })?
        } else {
            value
        };
        let data = FormData::from_value(value)
            .map_err(|e| FichaError::CorruptData(e.to_string()))?;

        if options.auto_migrate && self.migrations.needs_migration(&metadata.version) {
            let from_version = metadata.version.clone();
            let outcome = self.migrations.migrate(data, &from_version)?;
            let report = self.save(
                &outcome.payload,
                SaveOptions {
                    create_backup: false,
                    compress: self.config.compress,
                    update_analytics: false,
                },
            )?;
            info!(
                from = %from_version,
                steps = %outcome.applied.join(", "),
                "stored data migrated"
            );
            return Ok(LoadOutcome::Migrated {
                data: outcome.payload,
                from_version,
                metadata: report.metadata,
            });
        }

        if !self.is_data_valid(&metadata) {
            let age = self.clock.now() - metadata.timestamp;
            return Err(FichaError::StaleData {
                age_days: age.num_days(),
                max_age_days: self.config.max_age_days,
            });
        }

        Ok(LoadOutcome::Loaded { data, metadata })
    }

    /// Metadata of the live slot. Unparseable metadata is `CorruptData`.
    pub fn read_metadata(&self) -> Result<Option<Metadata>> {
        let Some(raw) = self.store.get(&self.keys.metadata)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| FichaError::CorruptData(format!("metadata: {}", e)))
    }

    /// True while the data is no older than `max_age_days`.
    pub fn is_data_valid(&self, metadata: &Metadata) -> bool {
        match Duration::try_days(self.config.max_age_days) {
            Some(max_age) => self.clock.now() - metadata.timestamp <= max_age,
            None => true,
        }
    }

    /// Promote backup `id`. A backup that does not decode is refused before
    /// anything is written.
    pub fn restore_backup(&self, id: i64) -> Result<RestoredBackup> {
        let restored = RestoredBackup::from(self.backups().restore_with(id, decode_entry)?);
        self.analytics()
            .record_action("backup_restored", json!({ "backup": restored.entry.id }));
        Ok(restored)
    }

    pub fn restore_latest(&self) -> Result<RestoredBackup> {
        let restored = RestoredBackup::from(self.backups().restore_latest_with(decode_entry)?);
        self.analytics()
            .record_action("backup_restored", json!({ "backup": restored.entry.id }));
        Ok(restored)
    }

    pub fn cleanup(&self, options: CleanupOptions) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        if options.remove_all {
            for key in self.keys.all() {
                self.store.remove(key)?;
                report.removed_keys.push(key.to_string());
            }
            info!("all stored data removed");
            return Ok(report);
        }

        if options.remove_backups {
            self.backups().clear()?;
            report.removed_keys.push(self.keys.backups.clone());
        }
        if options.remove_analytics {
            self.analytics().clear();
            report.removed_keys.push(self.keys.analytics.clone());
        }

        report.pruned_backups = self
            .backups()
            .prune_older_than(self.config.backup_max_age_days)?;

        if !options.remove_analytics {
            self.analytics().record_action(
                "data_cleaned",
                json!({
                    "removed": report.removed_keys,
                    "pruned": report.pruned_backups,
                }),
            );
        }
        Ok(report)
    }

    /// Read-only diagnostic. Each check is independent and none of them fail.
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport {
            quota_bytes: self.config.quota_bytes,
            ..IntegrityReport::default()
        };

        let mut live_raw = None;
        match self.store.get(&self.keys.data) {
            Ok(Some(raw)) => {
                if serde_json::from_str::<Value>(&raw).is_err() {
                    report
                        .issues
                        .push("Stored data is not valid JSON".to_string());
                    report
                        .recommendations
                        .push("Restore the latest backup".to_string());
                }
                live_raw = Some(raw);
            }
            Ok(None) => {}
            Err(e) => report
                .issues
                .push(format!("Could not read stored data: {}", e)),
        }

        match self.read_metadata() {
            Ok(Some(metadata)) => {
                if !self.is_data_valid(&metadata) {
                    let age = (self.clock.now() - metadata.timestamp).num_days();
                    report
                        .issues
                        .push(format!("Stored data is {} days old", age));
                    report
                        .recommendations
                        .push("Review the form and save it again".to_string());
                }
                if self.migrations.needs_migration(&metadata.version) {
                    report.recommendations.push(format!(
                        "Load once to migrate data from version {}",
                        metadata.version
                    ));
                }
                if let Some(raw) = &live_raw {
                    if fingerprint(raw) != metadata.checksum {
                        report
                            .issues
                            .push("Checksum does not match stored data".to_string());
                    }
                }
            }
            Ok(None) => {
                if live_raw.is_some() {
                    report.issues.push("Metadata is missing".to_string());
                }
            }
            Err(e) => report.issues.push(format!("Metadata is unreadable: {}", e)),
        }

        match self.backups().len() {
            Ok(count) => {
                report.backup_count = count;
                if count == 0 && live_raw.is_some() {
                    report
                        .recommendations
                        .push("No backups yet; the next save creates one".to_string());
                }
            }
            Err(e) => {
                report.issues.push(format!("Backups are unreadable: {}", e));
                report
                    .recommendations
                    .push("Run cleanup with --backups to reset them".to_string());
            }
        }

        match self.store.usage_bytes() {
            Ok(bytes) => {
                report.usage_bytes = bytes;
                let percent = report.usage_percent();
                if percent > USAGE_WARNING_PERCENT {
                    report
                        .issues
                        .push(format!("Storage is {:.0}% full", percent));
                    report
                        .recommendations
                        .push("Run cleanup to remove old backups".to_string());
                }
            }
            Err(e) => report
                .issues
                .push(format!("Could not measure storage usage: {}", e)),
        }

        report.is_valid = report.issues.is_empty();
        report
    }
}

impl From<(RestoreOutcome, FormData)> for RestoredBackup {
    fn from((outcome, data): (RestoreOutcome, FormData)) -> Self {
        RestoredBackup {
            entry: outcome.restored,
            data,
            safety_backup: outcome.safety_backup,
        }
    }
}

/// Decompresses `value`. A value still tagged afterwards is a broken envelope.
fn unwrap_envelope(value: Value) -> std::result::Result<Value, &'static str> {
    let value = codec::decompress(value);
    if codec::is_compressed(&value) {
        return Err("compressed envelope is malformed");
    }
    Ok(value)
}

/// Turn a backup's stored string back into form data.
pub fn decode_entry(entry: &BackupEntry) -> Result<FormData> {
    let corrupt =
        |reason: String| FichaError::CorruptData(format!("backup {}: {}", entry.id, reason));
    let value: Value =
        serde_json::from_str(&entry.data).map_err(|e| corrupt(e.to_string()))?;
    let value = unwrap_envelope(value).map_err(|reason| corrupt(reason.to_string()))?;
    FormData::from_value(value).map_err(|e| corrupt(e.to_string()))
}
