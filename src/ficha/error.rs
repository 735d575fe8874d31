use thiserror::Error;

#[derive(Error, Debug)]
pub enum FichaError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to write to storage: {0}")]
    StorageWrite(String),

    #[error("Stored data is corrupt: {0}")]
    CorruptData(String),

    #[error("Stored data is {age_days} days old (maximum is {max_age_days})")]
    StaleData { age_days: i64, max_age_days: i64 },

    #[error("Backup not found: {0}")]
    BackupNotFound(i64),

    #[error("No backups available")]
    NoBackups,

    #[error("Cannot migrate data from version {from} to {target} (stopped at {reached})")]
    MigrationGap {
        from: String,
        reached: String,
        target: String,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl FichaError {
    /// Errors that the load path may recover from by restoring the latest backup.
    pub fn is_recoverable_by_backup(&self) -> bool {
        matches!(
            self,
            FichaError::CorruptData(_) | FichaError::StaleData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FichaError>;
