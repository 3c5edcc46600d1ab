//! Key Table
//!
//! The in-memory key → value map behind a single reader/writer lock.
//!
//! ## Concurrency
//! - `get`, `len`, `find_key`: shared lock, any number at once
//! - `set`: exclusive lock for check-absent + insert only
//!
//! Keys are write-once: `set` never replaces an existing binding.
//! Iteration order is that of `HashMap` and carries no meaning.

use std::collections::HashMap;

use parking_lot::RwLock;

/// In-memory table of committed keys
pub struct KeyTable {
    data: RwLock<HashMap<String, String>>,
}

impl KeyTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get the value bound to `key` (read lock)
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Bind `key` to `value` if `key` is free (write lock)
    ///
    /// Returns `false` and leaves the table untouched if `key` is taken.
    pub fn set(&self, key: String, value: String) -> bool {
        let mut data = self.data.write();
        if data.contains_key(&key) {
            return false;
        }
        data.insert(key, value);
        true
    }

    /// Find some key bound to `value` by scanning every entry (read lock)
    ///
    /// O(n). When several keys share the value, which one is returned
    /// depends on hash iteration order and is unspecified.
    pub fn find_key(&self, value: &str) -> Option<String> {
        self.data
            .read()
            .iter()
            .find(|(_, v)| v.as_str() == value)
            .map(|(k, _)| k.clone())
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new()
    }
}
