// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use reelcache::cache::TtlCache;
use reelcache::clock;
use reelcache::config::{CacheBackend, Config};
use reelcache::store::{FileStore, KvStore, MemoryStore};
use reelcache::tmdb::{MediaSummary, TmdbClient};
use reelcache::watchmode::WatchmodeClient;

pub mod browse;
pub mod cache;
pub mod rows;
pub mod search;
pub mod top;
pub mod watch;

pub use browse::{DetailsCommand, RecsCommand, SeasonCommand, TrendingCommand};
pub use cache::CacheCommand;
pub use rows::RowsCommand;
pub use search::SearchCommand;
pub use top::TopCommand;
pub use watch::WatchCommand;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// Shared clients for command execution, all backed by one cache store.
pub struct CommandContext {
    pub config: Config,
    pub cache: TtlCache,
    pub tmdb: TmdbClient,
    pub watchmode: WatchmodeClient,
}

impl CommandContext {
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = match config.cache.backend {
            CacheBackend::File => match FileStore::new() {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!("File cache unavailable, using memory cache: {:#}", e);
                    Arc::new(MemoryStore::new())
                }
            },
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let cache = TtlCache::new(store, clock::system(), config.cache.clone());
        let tmdb = TmdbClient::new(&config.api, cache.clone())?;
        let watchmode =
            WatchmodeClient::new(&config.api, cache.clone(), config.hydration.concurrency)?;

        Ok(Self {
            config,
            cache,
            tmdb,
            watchmode,
        })
    }

    pub fn store(&self) -> &dyn KvStore {
        self.cache.store().as_ref()
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_summary(item: &MediaSummary) {
    let year = item.date().and_then(|d| d.get(..4)).unwrap_or("----");
    let kind = item.kind().map(|k| k.as_str()).unwrap_or("-");
    let rating = item
        .vote_average
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {:>8}  {:<5}  {}  {:>4}  {}",
        item.id,
        kind,
        year,
        rating,
        item.display_title()
    );
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
