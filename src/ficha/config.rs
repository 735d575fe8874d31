use crate::backup::DEFAULT_BACKUP_CAPACITY;
use crate::error::{FichaError, Result};
use crate::store::{StorageKeys, DEFAULT_PREFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

/// Configuration for ficha, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FichaConfig {
    /// Prefix of the four storage keys
    #[serde(default = "default_prefix")]
    pub storage_prefix: String,

    /// Data older than this many days is considered stale on load
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Number of snapshots kept in the backup ring
    #[serde(default = "default_backup_capacity")]
    pub backup_capacity: usize,

    /// Backups older than this many days are pruned by `cleanup`
    #[serde(default = "default_max_age_days")]
    pub backup_max_age_days: i64,

    /// Storage quota used by the integrity check
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,

    /// Whether saves compress the payload by default
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_max_age_days() -> i64 {
    30
}

fn default_backup_capacity() -> usize {
    DEFAULT_BACKUP_CAPACITY
}

fn default_quota_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_compress() -> bool {
    true
}

impl Default for FichaConfig {
    fn default() -> Self {
        Self {
            storage_prefix: default_prefix(),
            max_age_days: default_max_age_days(),
            backup_capacity: default_backup_capacity(),
            backup_max_age_days: default_max_age_days(),
            quota_bytes: default_quota_bytes(),
            compress: default_compress(),
        }
    }
}

impl FichaConfig {
    /// Keys accepted by [`get`](Self::get) and [`set`](Self::set).
    pub const KEYS: [&'static str; 6] = [
        "storage-prefix",
        "max-age-days",
        "backup-capacity",
        "backup-max-age-days",
        "quota-bytes",
        "compress",
    ];

    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(FichaError::Io)?;
        let config: FichaConfig =
            serde_json::from_str(&content).map_err(FichaError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(FichaError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(FichaError::Serialization)?;
        fs::write(config_path, content).map_err(FichaError::Io)?;
        Ok(())
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::with_prefix(&self.storage_prefix)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "storage-prefix" => self.storage_prefix.clone(),
            "max-age-days" => self.max_age_days.to_string(),
            "backup-capacity" => self.backup_capacity.to_string(),
            "backup-max-age-days" => self.backup_max_age_days.to_string(),
            "quota-bytes" => self.quota_bytes.to_string(),
            "compress" => self.compress.to_string(),
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || FichaError::Api(format!("Invalid value for {}: {}", key, value));
        match key {
            "storage-prefix" => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.storage_prefix = value.trim().to_string();
            }
            "max-age-days" => self.max_age_days = parse_days(value).ok_or_else(invalid)?,
            "backup-capacity" => {
                self.backup_capacity = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?
            }
            "backup-max-age-days" => {
                self.backup_max_age_days = parse_days(value).ok_or_else(invalid)?
            }
            "quota-bytes" => {
                self.quota_bytes = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(invalid)?
            }
            "compress" => self.compress = value.parse::<bool>().map_err(|_| invalid())?,
            other => return Err(FichaError::Api(format!("Unknown config key: {}", other))),
        }
        Ok(())
    }
}

/// Upper bound for the day-count settings, roughly a century.
pub const MAX_AGE_DAYS: i64 = 36_500;

fn parse_days(value: &str) -> Option<i64> {
    value
        .parse::<i64>()
        .ok()
        .filter(|n| (1..=MAX_AGE_DAYS).contains(n))
}
