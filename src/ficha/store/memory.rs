use super::KvStore;
use crate::error::{FichaError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// In-memory key-value store for testing.
///
/// Uses `RefCell` for interior mutability since ficha is single-threaded.
/// This avoids the overhead of `RwLock` while still allowing the
/// `KvStore` trait to use `&self` for all methods.
#[derive(Default)]
pub struct MemStore {
    entries: RefCell<BTreeMap<String, String>>,
    simulate_write_error: RefCell<bool>,
    failing_key: RefCell<Option<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for every key.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Make writes to a single key fail, leaving other keys writable.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.failing_key.borrow_mut() = key.map(str::to_string);
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(FichaError::Store("Simulated write error".to_string()));
        }
        if self.failing_key.borrow().as_deref() == Some(key) {
            return Err(FichaError::Store(format!(
                "Simulated write error for {}",
                key
            )));
        }
        Ok(())
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_io() {
        let store = MemStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_simulated_write_error() {
        let store = MemStore::new();
        store.set_simulate_write_error(true);
        assert!(store.set("k", "v").is_err());

        store.set_simulate_write_error(false);
        assert!(store.set("k", "v").is_ok());
    }

    #[test]
    fn test_failing_single_key() {
        let store = MemStore::new();
        store.fail_writes_to(Some("bad"));
        assert!(store.set("bad", "v").is_err());
        assert!(store.set("good", "v").is_ok());
        assert_eq!(store.keys().unwrap(), vec!["good".to_string()]);
    }
}
