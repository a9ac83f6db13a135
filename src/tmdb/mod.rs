// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Cached client for the TMDB v3 metadata API.

pub mod models;

pub use models::{
    CastMember, Episode, Genre, MediaDetails, MediaSummary, SeasonDetails, SeasonSummary,
    only_titles, without_anime,
};

use crate::cache::{CacheCategory, TtlCache};
use crate::config::{ApiConfig, TMDB_KEY_ENV};
use crate::error::ApiError;
use crate::media::{self, MediaKind};
use crate::player::MetadataSource;
use models::PagedResults;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub type DiscoverParams = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
    region: String,
    cache: TtlCache,
}

impl TmdbClient {
    pub fn new(config: &ApiConfig, cache: TtlCache) -> Result<Self, ApiError> {
        let api_key = config.tmdb_api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("{} is not set; metadata features are disabled", TMDB_KEY_ENV);
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(concat!("reelcache/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            region: config.region.clone(),
            cache,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    async fn fetch_json<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::MissingCredential(TMDB_KEY_ENV))?;

        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::InvalidArgument(format!("bad TMDB url {}: {}", path, e)))?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            query.append_pair("api_key", api_key);
        }

        debug!("TMDB request: {}", path);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("TMDB rate limit exceeded for {}", path);
            } else {
                warn!("TMDB request {} failed with status {}", path, status);
            }
            return Err(ApiError::from_status(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            warn!("JSON parsing error for {}: {} (body: {})", path, e, preview);
            ApiError::Parse(format!("{}: {}", path, e))
        })
    }

    async fn cached<T, F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        force_refresh: bool,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: serde::Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let ttl = self.cache.ttl_for(category);
        self.cache
            .get_or_fetch(&category.key(key), ttl, force_refresh, fetch)
            .await
    }

    pub async fn search_multi(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let key = format!("{}:{}", trimmed.to_lowercase(), page);
        let page = page.to_string();
        self.cached(CacheCategory::Search, &key, false, || async {
            let params = [
                ("query", trimmed),
                ("include_adult", "false"),
                ("page", page.as_str()),
                ("language", self.language.as_str()),
            ];
            let data: PagedResults<MediaSummary> =
                self.fetch_json("/search/multi", &params).await?;
            Ok(data.results)
        })
        .await
    }

    /// Weekly trending titles for the configured region.
    pub async fn trending_week(
        &self,
        kind: MediaKind,
        force_refresh: bool,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        self.trending(CacheCategory::TrendingWeek, "week", kind, force_refresh)
            .await
    }

    pub async fn trending_today(
        &self,
        kind: MediaKind,
        force_refresh: bool,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        self.trending(CacheCategory::TrendingDay, "day", kind, force_refresh)
            .await
    }

    async fn trending(
        &self,
        category: CacheCategory,
        window: &str,
        kind: MediaKind,
        force_refresh: bool,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        let path = format!("/trending/{}/{}", kind, window);
        self.cached(category, kind.as_str(), force_refresh, || async {
            let params = [
                ("language", self.language.as_str()),
                ("region", self.region.as_str()),
            ];
            let data: PagedResults<MediaSummary> = self.fetch_json(&path, &params).await?;
            Ok(data.results)
        })
        .await
    }

    /// Discover with sensible defaults; `params` override them. Without a
    /// `cache_key` the key is derived from the kind and the sorted params.
    pub async fn discover(
        &self,
        kind: MediaKind,
        cache_key: Option<&str>,
        params: &DiscoverParams,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        let key = cache_key
            .map(str::to_string)
            .unwrap_or_else(|| discover_cache_key(kind, params));
        let merged = discover_params(kind, params, &media::today());
        let path = format!("/discover/{}", kind);

        self.cached(CacheCategory::Discover, &key, false, || async {
            let pairs: Vec<(&str, &str)> = merged
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let data: PagedResults<MediaSummary> = self.fetch_json(&path, &pairs).await?;
            Ok(data.results)
        })
        .await
    }

    pub async fn details(&self, kind: MediaKind, id: u64) -> Result<MediaDetails, ApiError> {
        if id == 0 {
            return Err(ApiError::InvalidArgument("Missing media id".to_string()));
        }

        let key = format!("{}:{}", kind, id);
        let path = format!("/{}/{}", kind, id);
        self.cached(CacheCategory::Details, &key, false, || async {
            let params = [
                ("language", self.language.as_str()),
                (
                    "append_to_response",
                    "videos,credits,release_dates,content_ratings",
                ),
            ];
            self.fetch_json(&path, &params).await
        })
        .await
    }

    pub async fn recommendations(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        if id == 0 {
            return Err(ApiError::InvalidArgument("Missing media id".to_string()));
        }

        let key = format!("{}:{}", kind, id);
        let path = format!("/{}/{}/recommendations", kind, id);
        self.cached(CacheCategory::Recommendations, &key, false, || async {
            let params = [("language", self.language.as_str())];
            let data: PagedResults<MediaSummary> = self.fetch_json(&path, &params).await?;
            Ok(data.results)
        })
        .await
    }

    pub async fn season(&self, id: u64, season_number: u32) -> Result<SeasonDetails, ApiError> {
        if id == 0 {
            return Err(ApiError::InvalidArgument("Missing tv id".to_string()));
        }

        let key = format!("{}:{}", id, season_number);
        let path = format!("/tv/{}/season/{}", id, season_number);
        self.cached(CacheCategory::Season, &key, false, || async {
            let params = [("language", self.language.as_str())];
            self.fetch_json(&path, &params).await
        })
        .await
    }
}

impl MetadataSource for TmdbClient {
    fn fetch_details(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> impl Future<Output = Result<MediaDetails, ApiError>> {
        self.details(kind, id)
    }

    fn fetch_season(
        &self,
        id: u64,
        season_number: u32,
    ) -> impl Future<Output = Result<SeasonDetails, ApiError>> {
        self.season(id, season_number)
    }
}

/// Merges caller params over the default discover filters.
pub fn discover_params(kind: MediaKind, params: &DiscoverParams, today: &str) -> DiscoverParams {
    let mut merged = DiscoverParams::new();
    merged.insert("sort_by".into(), "popularity.desc".into());
    merged.insert("include_adult".into(), "false".into());
    merged.insert("vote_average.gte".into(), "5".into());
    let min_votes = match kind {
        MediaKind::Movie => "50",
        MediaKind::Tv => "20",
    };
    merged.insert("vote_count.gte".into(), min_votes.into());
    let date_cap = match kind {
        MediaKind::Movie => "primary_release_date.lte",
        MediaKind::Tv => "first_air_date.lte",
    };
    merged.insert(date_cap.into(), today.into());

    for (k, v) in params {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

pub fn discover_cache_key(kind: MediaKind, params: &DiscoverParams) -> String {
    // BTreeMap iteration is already sorted by key.
    let parts: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}:{}", kind, parts.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    // Nothing listens here, so any request that escapes the cache fails.
    const DEAD_URL: &str = "http://127.0.0.1:9";

    fn client(api_key: Option<&str>) -> TmdbClient {
        let config = ApiConfig {
            tmdb_api_key: api_key.map(str::to_string),
            tmdb_base_url: DEAD_URL.to_string(),
            ..ApiConfig::default()
        };
        let cache = TtlCache::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
            CacheConfig::default(),
        );
        TmdbClient::new(&config, cache).unwrap()
    }

    #[tokio::test]
    async fn missing_key_disables_requests() {
        let tmdb = client(None);
        assert!(!tmdb.is_enabled());

        let err = tmdb.trending_today(MediaKind::Movie, false).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential(TMDB_KEY_ENV)));
    }

    #[tokio::test]
    async fn blank_query_returns_empty_without_request() {
        let tmdb = client(Some("key"));
        assert!(tmdb.search_multi("   ", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cached_details_are_served_without_network() {
        let tmdb = client(Some("key"));
        let details = MediaDetails {
            id: 550,
            title: Some("Fight Club".to_string()),
            ..MediaDetails::default()
        };
        tmdb.cache().put(&CacheCategory::Details.key("movie:550"), &details);

        let got = tmdb.details(MediaKind::Movie, 550).await.unwrap();
        assert_eq!(got.display_title(), "Fight Club");
    }

    #[tokio::test]
    async fn search_cache_key_is_case_insensitive() {
        let tmdb = client(Some("key"));
        let hit = MediaSummary {
            id: 1,
            title: Some("Dune".to_string()),
            media_type: Some("movie".to_string()),
            ..MediaSummary::default()
        };
        tmdb.cache().put(&CacheCategory::Search.key("dune:1"), &vec![hit]);

        let results = tmdb.search_multi("  DUNE ", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn uncached_request_to_dead_host_is_an_error() {
        let tmdb = client(Some("key"));
        let err = tmdb.season(1399, 1).await.unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
    }

    #[tokio::test]
    async fn zero_id_is_rejected() {
        let tmdb = client(Some("key"));
        assert!(matches!(
            tmdb.details(MediaKind::Tv, 0).await,
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn discover_defaults_depend_on_kind_and_can_be_overridden() {
        let mut params = DiscoverParams::new();
        params.insert("vote_average.gte".into(), "7.5".into());
        params.insert("with_genres".into(), "28".into());

        let movie = discover_params(MediaKind::Movie, &params, "2025-01-02");
        assert_eq!(movie["vote_average.gte"], "7.5");
        assert_eq!(movie["vote_count.gte"], "50");
        assert_eq!(movie["primary_release_date.lte"], "2025-01-02");
        assert_eq!(movie["with_genres"], "28");
        assert_eq!(movie["include_adult"], "false");

        let tv = discover_params(MediaKind::Tv, &DiscoverParams::new(), "2025-01-02");
        assert_eq!(tv["vote_count.gte"], "20");
        assert_eq!(tv["first_air_date.lte"], "2025-01-02");
        assert!(!tv.contains_key("primary_release_date.lte"));
    }

    #[test]
    fn discover_key_is_order_independent() {
        let mut a = DiscoverParams::new();
        a.insert("b".into(), "2".into());
        a.insert("a".into(), "1".into());
        let mut b = DiscoverParams::new();
        b.insert("a".into(), "1".into());
        b.insert("b".into(), "2".into());

        assert_eq!(discover_cache_key(MediaKind::Tv, &a), "tv:a=1&b=2");
        assert_eq!(
            discover_cache_key(MediaKind::Tv, &a),
            discover_cache_key(MediaKind::Tv, &b)
        );
    }
}
