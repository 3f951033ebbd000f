//! # Persisted local state (QA switches).
//!
//! The host persists a handful of debug keys across page loads (`gd_debug`,
//! `gd_tag`, `gd_debug_ex`, `gd_disable_midroll_timer`). The core only reads them.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Read access to the host's persisted key/value store.
pub trait LocalStore: Send + Sync + 'static {
    /// Raw value for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Truthy reading of `key`: `"true"` or `"1"`.
    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key).as_deref().map(str::trim), Some("true" | "1"))
    }
}

/// In-memory [`LocalStore`], used when the host has no persistent storage.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.insert(key.into(), value.into());
    }

    /// Removes `key`.
    pub fn remove(&self, key: &str) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.remove(key);
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        g.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bool() {
        let s = MemoryStore::new();
        assert!(!s.get_bool("gd_debug"));
        s.set("gd_debug", "1");
        assert!(s.get_bool("gd_debug"));
        s.set("gd_debug", "false");
        assert!(!s.get_bool("gd_debug"));
        s.remove("gd_debug");
        assert_eq!(s.get("gd_debug"), None);
    }
}
