//! # Backup Ring
//!
//! A bounded, oldest-first list of snapshots of the live slot, stored as a
//! single JSON array under the backups key.
//!
//! - `create_backup` copies the live data and metadata strings verbatim and
//!   appends them; once the ring exceeds its capacity the oldest entries go.
//! - `restore_with` first snapshots the current live slot (so a restore can itself
//!   be undone), then writes the chosen entry back into the live slot. The
//!   restored entry stays in the ring, even when the snapshot overflows it.
//! - `recover_latest_with` promotes the newest entry without a snapshot. It
//!   backs the load fallback, where the live slot is already unusable.
//!
//! Entry ids are creation milliseconds. When two backups land in the same
//! millisecond the later one takes `previous + 1`, keeping ids unique and
//! increasing.

use crate::clock::Clock;
use crate::error::{FichaError, Result};
use crate::model::BackupEntry;
use crate::store::{KvStore, StorageKeys};
use chrono::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BACKUP_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    pub restored: BackupEntry,
    /// Snapshot of the live slot taken before the restore, if it held data.
    pub safety_backup: Option<BackupEntry>,
}

pub struct BackupRing<'a, S: KvStore, C: Clock> {
    store: &'a S,
    keys: &'a StorageKeys,
    clock: &'a C,
    capacity: usize,
}

impl<'a, S: KvStore, C: Clock> BackupRing<'a, S, C> {
    pub fn new(store: &'a S, keys: &'a StorageKeys, clock: &'a C, capacity: usize) -> Self {
        Self {
            store,
            keys,
            clock,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current entries, oldest first.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let Some(raw) = self.store.get(&self.keys.backups)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|e| FichaError::CorruptData(format!("backup list is unreadable: {}", e)))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    pub fn latest(&self) -> Result<Option<BackupEntry>> {
        Ok(self.list()?.pop())
    }

    fn write(&self, entries: &[BackupEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store
            .set(&self.keys.backups, &raw)
            .map_err(|e| FichaError::StorageWrite(e.to_string()))
    }

    fn next_id(&self, entries: &[BackupEntry]) -> i64 {
        let now_ms = self.clock.now().timestamp_millis();
        match entries.iter().map(|e| e.id).max() {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        }
    }

    /// Snapshot the live slot. Returns `None` when there is nothing to back up.
    pub fn create_backup(&self) -> Result<Option<BackupEntry>> {
        self.snapshot(None)
    }

    /// Appends a snapshot of the live slot. Eviction skips the entry `keep`.
    fn snapshot(&self, keep: Option<i64>) -> Result<Option<BackupEntry>> {
        let Some(data) = self.store.get(&self.keys.data)? else {
            debug!("live slot empty, skipping backup");
            return Ok(None);
        };
        let metadata = self.store.get(&self.keys.metadata)?;

        let mut entries = match self.list() {
            Ok(entries) => entries,
            Err(FichaError::CorruptData(reason)) => {
                warn!(%reason, "discarding unreadable backup list");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let size = data.len() + metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let entry = BackupEntry {
            id: self.next_id(&entries),
            timestamp: self.clock.now(),
            data,
            metadata,
            size,
        };
        entries.push(entry.clone());

        let mut excess = entries.len().saturating_sub(self.capacity);
        entries.retain(|e| {
            if excess > 0 && Some(e.id) != keep {
                excess -= 1;
                false
            } else {
                true
            }
        });

        self.write(&entries)?;
        debug!(id = entry.id, count = entries.len(), "backup created");
        Ok(Some(entry))
    }

    /// Promote backup `id` into the live slot after running `decode` on it.
    /// A decode error leaves the live slot and the ring untouched.
    pub fn restore_with<T, F>(&self, id: i64, decode: F) -> Result<(RestoreOutcome, T)>
    where
        F: FnOnce(&BackupEntry) -> Result<T>,
    {
        let target = self
            .list()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or(FichaError::BackupNotFound(id))?;
        let decoded = decode(&target)?;

        let safety_backup = self.snapshot(Some(target.id))?;
        self.promote(&target)?;

        info!(id, "backup restored");
        Ok((
            RestoreOutcome {
                restored: target,
                safety_backup,
            },
            decoded,
        ))
    }

    pub fn restore_latest_with<T, F>(&self, decode: F) -> Result<(RestoreOutcome, T)>
    where
        F: FnOnce(&BackupEntry) -> Result<T>,
    {
        let latest = self.latest()?.ok_or(FichaError::NoBackups)?;
        self.restore_with(latest.id, decode)
    }

    /// Promote the newest backup over an unusable live slot. No safety
    /// snapshot is taken, so the ring is left as it was.
    pub fn recover_latest_with<T, F>(&self, decode: F) -> Result<(BackupEntry, T)>
    where
        F: FnOnce(&BackupEntry) -> Result<T>,
    {
        let latest = self.latest()?.ok_or(FichaError::NoBackups)?;
        let decoded = decode(&latest)?;
        self.promote(&latest)?;
        info!(id = latest.id, "live slot recovered from backup");
        Ok((latest, decoded))
    }

    fn promote(&self, entry: &BackupEntry) -> Result<()> {
        self.store
            .set(&self.keys.data, &entry.data)
            .map_err(|e| FichaError::StorageWrite(e.to_string()))?;
        match &entry.metadata {
            Some(metadata) => self
                .store
                .set(&self.keys.metadata, metadata)
                .map_err(|e| FichaError::StorageWrite(e.to_string())),
            None => self.store.remove(&self.keys.metadata),
        }
    }

    /// Drop entries older than `max_age_days`. Returns how many were removed.
    /// An age too large to subtract from the current time prunes nothing.
    pub fn prune_older_than(&self, max_age_days: i64) -> Result<usize> {
        let Some(cutoff) = Duration::try_days(max_age_days.max(0))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
        else {
            debug!(max_age_days, "prune cutoff out of range, keeping all backups");
            return Ok(0);
        };
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);

        let removed = before - entries.len();
        if removed > 0 {
            self.write(&entries)?;
            info!(removed, "pruned aged backups");
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.keys.backups)
    }
}
