//! # Storage Layer
//!
//! All persistent state lives in a flat, string-keyed map. The [`KvStore`]
//! trait is that map; components receive a handle to it instead of reaching
//! for a global.
//!
//! ## Key Ownership
//!
//! Four logical keys are derived from a configurable prefix ([`StorageKeys`]):
//!
//! ```text
//! {prefix}_data        live payload (plain JSON or compressed envelope)
//! {prefix}_metadata    Metadata for the live payload
//! {prefix}_backups     JSON array of BackupEntry (the ring)
//! {prefix}_analytics   AnalyticsRecord
//! ```
//!
//! The persistence facade writes the live data and metadata keys, the backup
//! ring writes the backups key (and the live keys on restore), the analytics
//! recorder writes the analytics key. No two components write the same key
//! during one operation.
//!
//! ## Concurrency
//!
//! None. Methods take `&self` and implementations use interior mutability
//! where needed. Two processes sharing one [`fs::FileKvStore`] directory get
//! last-writer-wins semantics per key.
//!
//! ## Implementations
//!
//! - [`fs::FileKvStore`]: one file per key, atomic writes.
//! - [`memory::MemStore`]: for testing logic without filesystem I/O.

use crate::error::Result;

pub mod fs;
pub mod memory;

pub const DEFAULT_PREFIX: &str = "fichaTecnica";

/// Abstract interface for the key-value medium.
pub trait KvStore {
    /// Read a value. Returns Ok(None) when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently present.
    fn keys(&self) -> Result<Vec<String>>;

    /// Rough storage utilisation: bytes of every key plus its value.
    fn usage_bytes(&self) -> Result<usize> {
        let mut total = 0;
        for key in self.keys()? {
            let value_len = self.get(&key)?.map(|v| v.len()).unwrap_or(0);
            total += key.len() + value_len;
        }
        Ok(total)
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

/// The four storage keys used by one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub data: String,
    pub metadata: String,
    pub backups: String,
    pub analytics: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            data: format!("{}_data", prefix),
            metadata: format!("{}_metadata", prefix),
            backups: format!("{}_backups", prefix),
            analytics: format!("{}_analytics", prefix),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.data, &self.metadata, &self.backups, &self.analytics]
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}
