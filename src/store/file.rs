// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{KvStore, StoreResult};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// One JSON file per key under a directory, plus an `index.json` mapping the
/// original keys to their hashed file names.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    index: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store in the user cache directory.
    pub fn new() -> Result<Self> {
        let dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?
            .join("reelcache");
        Self::open(dir)
    }

    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries_dir = dir.join("entries");
        if !entries_dir.exists() {
            fs::create_dir_all(&entries_dir).with_context(|| {
                format!("Failed to create cache directory: {}", entries_dir.display())
            })?;
        }

        let index_path = dir.join("index.json");
        let index = if index_path.exists() {
            match Self::load_index(&index_path) {
                Ok(index) => index,
                Err(e) => {
                    warn!("Discarding unreadable cache index: {:#}", e);
                    let index = HashMap::new();
                    if let Err(e) = Self::write_index(&index_path, &index) {
                        warn!("Failed to rewrite cache index: {}", e);
                    }
                    index
                }
            }
        } else {
            HashMap::new()
        };

        debug!("Opened file store at {}", dir.display());
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn file_name(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{}.json", &format!("{:x}", hasher.finalize())[..16])
    }

    fn entry_path(&self, file_name: &str) -> PathBuf {
        self.dir.join("entries").join(file_name)
    }

    fn load_index(path: &Path) -> Result<HashMap<String, String>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache index: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse cache index JSON")
    }

    fn write_index(path: &Path, index: &HashMap<String, String>) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(index)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn save_index(&self, index: &HashMap<String, String>) -> StoreResult<()> {
        Self::write_index(&self.dir.join("index.json"), index)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(&Self::file_name(key));
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let file_name = Self::file_name(key);
        let entries_dir = self.dir.join("entries");
        if !entries_dir.exists() {
            fs::create_dir_all(&entries_dir)?;
        }
        let path = self.entry_path(&file_name);
        fs::write(&path, value)?;

        let mut index = self.lock();
        if index.insert(key.to_string(), file_name).is_none()
            && let Err(e) = self.save_index(&index)
        {
            // Every entry on disk has an index row.
            index.remove(key);
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(&Self::file_name(key));
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let mut index = self.lock();
        if index.remove(key).is_some() {
            self.save_index(&index)?;
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let entries_dir = self.dir.join("entries");
        if entries_dir.exists() {
            fs::remove_dir_all(&entries_dir)?;
        }
        fs::create_dir_all(&entries_dir)?;

        let mut index = self.lock();
        index.clear();
        self.save_index(&index)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
