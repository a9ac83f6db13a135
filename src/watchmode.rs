// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Watch-provider catalog client.
//!
//! Unlike the metadata client this one never surfaces errors to callers of
//! the list endpoints: a missing key, an HTTP failure or a bad payload all
//! come back as `None` after being logged.

use crate::cache::{CacheCategory, TtlCache};
use crate::config::{ApiConfig, WATCHMODE_KEY_ENV};
use crate::error::ApiError;
use crate::hydrate::{
    ExternalTitle, Hydrated, IdHydrator, IdMappingStore, ResolvedId, TitleResolver,
};
use crate::media::MediaKind;
use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

const LIST_LIMIT: usize = 20;
const TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Netflix,
    Prime,
    Disney,
    Hotstar,
    AppleTv,
    Zee5,
    SonyLiv,
}

impl Source {
    pub const ALL: [Source; 7] = [
        Source::Netflix,
        Source::Prime,
        Source::Disney,
        Source::Hotstar,
        Source::AppleTv,
        Source::Zee5,
        Source::SonyLiv,
    ];

    pub fn id(&self) -> u32 {
        match self {
            Source::Netflix => 203,
            Source::Prime => 26,
            Source::Disney => 372,
            Source::Hotstar => 371,
            Source::AppleTv => 387,
            Source::Zee5 => 358,
            Source::SonyLiv => 353,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Source::Netflix => "netflix",
            Source::Prime => "prime",
            Source::Disney => "disney",
            Source::Hotstar => "hotstar",
            Source::AppleTv => "appletv",
            Source::Zee5 => "zee5",
            Source::SonyLiv => "sonyliv",
        }
    }

    /// Accepts a known name or any numeric source ID.
    pub fn parse_id(s: &str) -> Result<u32> {
        let lower = s.trim().to_lowercase();
        if let Some(source) = Self::ALL.iter().find(|src| src.name() == lower) {
            return Ok(source.id());
        }
        lower.parse::<u32>().map_err(|_| {
            anyhow::anyhow!(
                "Unknown source: {}. Use a name like 'netflix' or a numeric ID",
                s
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTitle {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default, rename = "type")]
    pub title_type: Option<String>,
}

impl ExternalTitle for ProviderTitle {
    fn external_id(&self) -> u64 {
        self.id
    }
}

pub type HydratedTitle = Hydrated<ProviderTitle>;

#[derive(Debug, Clone, Deserialize)]
struct ListTitlesResponse {
    /// Absent on error payloads. Those are not cached as an empty list.
    #[serde(default)]
    titles: Option<Vec<ProviderTitle>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub tmdb_type: Option<String>,
}

impl TitleDetails {
    pub fn resolved(&self) -> Result<ResolvedId, ApiError> {
        let canonical_id = self
            .tmdb_id
            .filter(|id| *id != 0)
            .ok_or(ApiError::MissingField("tmdb_id"))?;
        let kind = if self.tmdb_type.as_deref() == Some("movie") {
            MediaKind::Movie
        } else {
            MediaKind::Tv
        };
        Ok(ResolvedId { canonical_id, kind })
    }
}

#[derive(Debug, Clone)]
pub struct WatchmodeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache,
    mappings: IdMappingStore,
    concurrency: usize,
}

impl WatchmodeClient {
    pub fn new(config: &ApiConfig, cache: TtlCache, concurrency: usize) -> Result<Self, ApiError> {
        let api_key = config
            .watchmode_api_key
            .clone()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("{} is not set; watch-provider features are disabled", WATCHMODE_KEY_ENV);
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(concat!("reelcache/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base_url: config.watchmode_base_url.trim_end_matches('/').to_string(),
            api_key,
            mappings: IdMappingStore::new(cache.clone()),
            cache,
            concurrency,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn mappings(&self) -> &IdMappingStore {
        &self.mappings
    }

    async fn try_fetch_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::MissingCredential(WATCHMODE_KEY_ENV))?;

        let separator = if path.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}{}apiKey={}",
            self.base_url,
            path,
            separator,
            urlencoding::encode(api_key)
        );

        debug!("Watchmode request: {}", path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                error!("Watchmode rate limit exceeded for {}", path);
            } else {
                error!("Watchmode request {} failed with status {}", path, status);
            }
            return Err(ApiError::from_status(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse(format!("{}: {}", path, e)))
    }

    async fn fetch_json<T>(&self, path: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.try_fetch_json(path).await {
            Ok(data) => Some(data),
            Err(ApiError::MissingCredential(var)) => {
                warn!("Missing {}; watch-provider features are disabled", var);
                None
            }
            Err(e) => {
                error!("Watchmode fetch failed: {}", e);
                None
            }
        }
    }

    /// Most popular titles for one or more sources, provider IDs only.
    pub async fn list_titles(&self, source_ids: &[u32]) -> Option<Vec<ProviderTitle>> {
        let path = format!(
            "/list-titles/?source_ids={}&sort_by=popularity_desc&limit={}",
            join_ids(source_ids),
            LIST_LIMIT
        );
        let data: ListTitlesResponse = self.fetch_json(&path).await?;
        if data.titles.is_none() {
            warn!("Watchmode response for {} has no titles", path);
        }
        data.titles
    }

    pub async fn title_details(&self, id: u64) -> Result<TitleDetails, ApiError> {
        self.try_fetch_json(&format!("/title/{}/details/", id)).await
    }

    /// Top titles for the given sources, hydrated with metadata IDs and
    /// optionally narrowed to one kind. The list endpoint mixes kinds, so the
    /// filter runs after hydration. Cached for a day.
    pub async fn top_content(
        &self,
        source_ids: &[u32],
        kind: Option<MediaKind>,
    ) -> Option<Vec<HydratedTitle>> {
        let key = CacheCategory::ProviderList.key(&top_cache_suffix(source_ids, kind));
        let ttl = self.cache.ttl_for(CacheCategory::ProviderList);
        if let Some(cached) = self.cache.get::<Vec<HydratedTitle>>(&key, ttl) {
            debug!("Serving {} from cache", key);
            return Some(cached);
        }

        let titles = self.list_titles(source_ids).await?;
        let hydrated = IdHydrator::new(self, &self.mappings, self.concurrency)
            .hydrate(titles)
            .await;

        let top = filter_top(hydrated, kind);
        self.cache.put(&key, &top);
        Some(top)
    }
}

impl TitleResolver for WatchmodeClient {
    fn resolve(&self, external_id: u64) -> impl Future<Output = Result<ResolvedId, ApiError>> {
        async move { self.title_details(external_id).await?.resolved() }
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn top_cache_suffix(source_ids: &[u32], kind: Option<MediaKind>) -> String {
    format!(
        "{}_{}",
        join_ids(source_ids),
        kind.map(|k| k.as_str()).unwrap_or("all")
    )
}

fn filter_top(hydrated: Vec<HydratedTitle>, kind: Option<MediaKind>) -> Vec<HydratedTitle> {
    hydrated
        .into_iter()
        .filter(|title| kind.is_none_or(|k| title.media_type == k))
        .take(TOP_LIMIT)
        .collect()
}
