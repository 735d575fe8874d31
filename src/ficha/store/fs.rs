use super::KvStore;
use crate::error::{FichaError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const VALUE_EXT: &str = ".json";

/// File-backed key-value store: one file per key under `root`.
///
/// Key names are mapped to file names by replacing anything outside
/// `[A-Za-z0-9_.-]` with `_`, so distinct keys that differ only in such
/// characters collide. The keys used by ficha are plain identifiers.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", file_stem_for(key), VALUE_EXT))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(FichaError::Io)?;
        }
        Ok(())
    }
}

fn file_stem_for(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(FichaError::Io)?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_dir()?;
        let target = self.value_path(key);

        // Atomic write
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value).map_err(FichaError::Io)?;
        fs::rename(&tmp, target).map_err(FichaError::Io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(path).map_err(FichaError::Io)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(FichaError::Io)? {
            let path = entry.map_err(FichaError::Io)?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
                if let Some(key) = name.strip_suffix(VALUE_EXT) {
                    keys.push(key.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileKvStore) {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::new(dir.path().join("storage"));
        (dir, store)
    }

    #[test]
    fn test_missing_root_reads_as_empty() {
        let (_dir, store) = setup();
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_set_get_remove() {
        let (_dir, store) = setup();
        store.set("fichaTecnica_data", "{\"a\":1}").unwrap();
        assert_eq!(
            store.get("fichaTecnica_data").unwrap(),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(store.keys().unwrap(), vec!["fichaTecnica_data".to_string()]);

        store.remove("fichaTecnica_data").unwrap();
        assert_eq!(store.get("fichaTecnica_data").unwrap(), None);
        // Removing twice is fine
        store.remove("fichaTecnica_data").unwrap();
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let (_dir, store) = setup();
        store.set("k", "v").unwrap();
        store.set("k", "v2").unwrap();

        for entry in fs::read_dir(store.root()).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
        }
    }

    #[test]
    fn test_key_sanitized_into_file_name() {
        let (_dir, store) = setup();
        store.set("a/b", "v").unwrap();
        assert!(store.root().join("a_b.json").exists());
        assert_eq!(store.get("a/b").unwrap(), Some("v".to_string()));
    }
}
