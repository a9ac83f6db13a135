// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{KvStore, StoreResult};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-process store with an optional byte quota, counted over keys and values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn used_bytes(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.lock();

        if let Some(quota) = self.quota_bytes {
            let current = Self::used_bytes(&entries);
            let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let used = current - replaced + key.len() + value.len();
            if used > quota {
                return Err(StoreError::QuotaExceeded { used, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock().clear();
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_rejects_oversized_write_and_keeps_old_value() {
        let store = MemoryStore::with_quota(16);
        store.set("k", "small").unwrap();

        let err = store.set("k", "this value is far too large").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { quota: 16, .. }));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn overwrite_within_quota_is_accounted_once() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        store.set("k", "54321").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("54321"));
    }

    #[test]
    fn keys_are_sorted_and_clear_empties() {
        let store = MemoryStore::new();
        store.set("b", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);

        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
