// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DAY_SECS: u64 = 24 * 60 * 60;
const WEEK_SECS: u64 = 7 * DAY_SECS;

pub const TMDB_KEY_ENV: &str = "TMDB_API_KEY";
pub const WATCHMODE_KEY_ENV: &str = "WATCHMODE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub hydration: HydrationConfig,
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub tmdb_api_key: Option<String>,
    pub watchmode_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub watchmode_base_url: String,
    pub language: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
}

/// Time-to-live per data category, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub trending_week_secs: u64,
    pub trending_day_secs: u64,
    pub discover_secs: u64,
    pub details_secs: u64,
    pub recommendations_secs: u64,
    pub season_secs: u64,
    pub search_secs: u64,
    pub provider_list_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    /// Maximum in-flight detail lookups. 1 keeps lookups strictly sequential.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub embed_base_url: String,
    pub idle_timeout_secs: u64,
    pub controls_hide_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            watchmode_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            watchmode_base_url: "https://api.watchmode.com/v1".to_string(),
            language: "en-IN".to_string(),
            region: "IN".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            trending_week_secs: WEEK_SECS,
            trending_day_secs: DAY_SECS,
            discover_secs: WEEK_SECS,
            details_secs: WEEK_SECS,
            recommendations_secs: WEEK_SECS,
            season_secs: WEEK_SECS,
            search_secs: DAY_SECS,
            provider_list_secs: DAY_SECS,
        }
    }
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            embed_base_url: "https://cinemaos.tech/player".to_string(),
            idle_timeout_secs: 300,
            controls_hide_ms: 3000,
        }
    }
}

impl PlayerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn controls_hide(&self) -> Duration {
        Duration::from_millis(self.controls_hide_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        if !path.as_ref().exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Could not load config file, using defaults: {:#}", e);
            Self::default()
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("reelcache").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Environment variables win over keys from the config file.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env(|name| std::env::var(name).ok());
        self
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(TMDB_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api.tmdb_api_key = Some(key);
        }
        if let Some(key) = lookup(WATCHMODE_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api.watchmode_api_key = Some(key);
        }
    }
}
