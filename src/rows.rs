// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Browse rows and the trending banner.
//!
//! Rows load concurrently and independently: one failing row comes back
//! empty and never takes the others down with it.

use crate::error::ApiError;
use crate::media::MediaKind;
use crate::media::MediaKind::{Movie, Tv};
use crate::store::KvStore;
use crate::tmdb::{DiscoverParams, MediaSummary, TmdbClient, without_anime};
use anyhow::Result;
use futures_util::future;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};

const BANNER_SLIDES_PER_KIND: usize = 5;
const PERSONALIZED_CAP: usize = 20;
pub const CONTINUE_WATCHING: &str = "continue-watching";

#[derive(Debug, Clone, PartialEq)]
pub enum RowSource {
    TrendingToday,
    Discover(DiscoverParams),
    /// Items kept locally in the store under the row ID.
    Personalized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub source: RowSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedRow {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub items: Vec<MediaSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Movies,
    Shows,
    NewPopular,
}

impl Page {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "movies" | "movie" => Ok(Self::Movies),
            "shows" | "tv" => Ok(Self::Shows),
            "new" | "new-popular" => Ok(Self::NewPopular),
            _ => anyhow::bail!("Invalid page: {}. Use 'home', 'movies', 'shows', or 'new'", s),
        }
    }
}

const NEW_POPULAR_IDS: [&str; 6] = [
    "trending-today-movies",
    "trending-today-shows",
    "new-on-netflix",
    "bingeworthy-tv-shows",
    "bingeworthy-movies",
    "set-in-india",
];

enum RowDef {
    Trending,
    Discover(&'static [(&'static str, &'static str)]),
    Personalized,
}

const CATALOG: &[(&str, &str, MediaKind, RowDef)] = &[
    ("trending-today-movies", "Trending Today – Movies", Movie, RowDef::Trending),
    ("trending-today-shows", "Trending Today – Shows", Tv, RowDef::Trending),
    (
        "exciting-hindi-movies",
        "Exciting Indian Movies",
        Movie,
        RowDef::Discover(&[
            ("with_origin_country", "IN"),
            ("primary_release_date.gte", "{last_year}-01-01"),
        ]),
    ),
    (
        "new-on-netflix",
        "New on Anymovie",
        Movie,
        RowDef::Discover(&[("region", "IN"), ("primary_release_date.gte", "2023-01-01")]),
    ),
    (
        "bingeworthy-tv-shows",
        "Bingeworthy TV Shows",
        Tv,
        RowDef::Discover(&[("vote_average.gte", "7.5"), ("vote_count.gte", "300")]),
    ),
    (
        "bingeworthy-movies",
        "Bingeworthy Movies",
        Movie,
        RowDef::Discover(&[("vote_average.gte", "7.2"), ("vote_count.gte", "500")]),
    ),
    (
        "asian-movies-tv",
        "Asian Movies & TV",
        Movie,
        RowDef::Discover(&[
            ("with_origin_country", "JP|KR|CN|HK|TW|TH"),
            ("vote_average.gte", "6.2"),
        ]),
    ),
    (
        "set-in-india",
        "Films & TV Series Set in India",
        Tv,
        RowDef::Discover(&[("with_origin_country", "IN")]),
    ),
    (CONTINUE_WATCHING, "Continue Watching for You", Movie, RowDef::Personalized),
    ("because-you-watched", "Because You Watched", Movie, RowDef::Personalized),
    ("we-think-you-might-like", "We Think You Might Like", Movie, RowDef::Personalized),
    (
        "hollywood-action",
        "Hollywood Action Movies",
        Movie,
        RowDef::Discover(&[
            ("with_origin_country", "US"),
            ("with_genres", "28"),
            ("vote_average.gte", "6.5"),
        ]),
    ),
    (
        "us-family",
        "US Family Movies",
        Movie,
        RowDef::Discover(&[("with_origin_country", "US"), ("with_genres", "10751")]),
    ),
    (
        "critically-acclaimed-comedies",
        "Critically Acclaimed Comedies",
        Movie,
        RowDef::Discover(&[
            ("with_genres", "35"),
            ("vote_count.gte", "200"),
            ("vote_average.gte", "7.5"),
        ]),
    ),
    ("us-movies", "US Movies", Movie, RowDef::Discover(&[("with_origin_country", "US")])),
    ("us-tv-shows", "US TV Shows", Tv, RowDef::Discover(&[("with_origin_country", "US")])),
    (
        "tv-dramas",
        "TV Dramas",
        Tv,
        RowDef::Discover(&[("with_genres", "18"), ("without_origin_country", "US")]),
    ),
    (
        "indian-action",
        "Indian Action",
        Movie,
        RowDef::Discover(&[("with_origin_country", "IN"), ("with_genres", "28")]),
    ),
    (
        "rousing-action-adventure",
        "Rousing Action & Adventure",
        Movie,
        RowDef::Discover(&[("with_genres", "28,12")]),
    ),
    ("dont-watch-alone", "Don't Watch Alone", Movie, RowDef::Discover(&[("with_genres", "27")])),
    ("sci-fi-movies", "Sci-Fi Movies", Movie, RowDef::Discover(&[("with_genres", "878")])),
    ("sci-fi-shows", "Sci-Fi Shows", Tv, RowDef::Discover(&[("with_genres", "10765")])),
    (
        "crowd-pleasers",
        "Crowd Pleasers",
        Movie,
        RowDef::Discover(&[("vote_average.gte", "7"), ("vote_count.gte", "1000")]),
    ),
    (
        "tamil-telugu-hits",
        "Tamil & Telugu Hits",
        Movie,
        RowDef::Discover(&[("with_original_language", "ta|te")]),
    ),
    ("animation-tv", "Animation TV", Tv, RowDef::Discover(&[("with_genres", "16")])),
    (
        "thrillers-mysteries",
        "Thrillers & Mysteries",
        Movie,
        RowDef::Discover(&[("with_genres", "53,9648")]),
    ),
    (
        "feel-good-comedy",
        "Feel-Good Comedy Movies",
        Movie,
        RowDef::Discover(&[("with_genres", "35"), ("vote_average.gte", "6.8")]),
    ),
    (
        "international-movies",
        "International Movies",
        Movie,
        RowDef::Discover(&[("without_origin_country", "US")]),
    ),
    (
        "international-shows",
        "International Shows",
        Tv,
        RowDef::Discover(&[("without_origin_country", "US")]),
    ),
];

/// Every built-in row. `year` fills the relative date filters.
pub fn catalog(year: i32) -> Vec<Row> {
    let last_year = (year - 1).to_string();
    CATALOG
        .iter()
        .map(|(id, title, kind, def)| Row {
            id: id.to_string(),
            title: title.to_string(),
            kind: *kind,
            source: match def {
                RowDef::Trending => RowSource::TrendingToday,
                RowDef::Personalized => RowSource::Personalized,
                RowDef::Discover(pairs) => {
                    let mut params = DiscoverParams::new();
                    params.insert("sort_by".into(), "popularity.desc".into());
                    for (k, v) in pairs.iter() {
                        params.insert(k.to_string(), v.replace("{last_year}", &last_year));
                    }
                    RowSource::Discover(params)
                }
            },
        })
        .collect()
}

pub fn rows_for_page(rows: Vec<Row>, page: Page) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| match page {
            Page::Home => true,
            Page::Movies => row.kind == MediaKind::Movie,
            Page::Shows => row.kind == MediaKind::Tv,
            Page::NewPopular => NEW_POPULAR_IDS.contains(&row.id.as_str()),
        })
        .collect()
}

/// The remote calls rows depend on.
pub trait RowFetcher {
    fn trending_today(
        &self,
        kind: MediaKind,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>>;

    fn trending_week(
        &self,
        kind: MediaKind,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>>;

    fn discover(
        &self,
        kind: MediaKind,
        cache_key: &str,
        params: &DiscoverParams,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>>;
}

impl RowFetcher for TmdbClient {
    fn trending_today(
        &self,
        kind: MediaKind,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>> {
        TmdbClient::trending_today(self, kind, false)
    }

    fn trending_week(
        &self,
        kind: MediaKind,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>> {
        TmdbClient::trending_week(self, kind, false)
    }

    fn discover(
        &self,
        kind: MediaKind,
        cache_key: &str,
        params: &DiscoverParams,
    ) -> impl Future<Output = Result<Vec<MediaSummary>, ApiError>> {
        TmdbClient::discover(self, kind, Some(cache_key), params)
    }
}

pub fn personalized(store: &dyn KvStore, row_id: &str) -> Vec<MediaSummary> {
    match store.get(row_id) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!("Ignoring unreadable personalized row {}: {}", row_id, e);
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to read personalized row {}: {}", row_id, e);
            Vec::new()
        }
    }
}

/// Moves `item` to the front of a personalized row, deduplicated by ID.
pub fn remember(store: &dyn KvStore, row_id: &str, item: MediaSummary) {
    let mut items = personalized(store, row_id);
    items.retain(|existing| existing.id != item.id);
    items.insert(0, item);
    items.truncate(PERSONALIZED_CAP);

    match serde_json::to_string(&items) {
        Ok(raw) => {
            if let Err(e) = store.set(row_id, &raw) {
                warn!("Dropping personalized row update for {}: {}", row_id, e);
            }
        }
        Err(e) => warn!("Failed to serialize personalized row {}: {}", row_id, e),
    }
}

/// Drops items with no date or a date after `today` (`YYYY-MM-DD`).
pub fn released_only(items: Vec<MediaSummary>, today: &str) -> Vec<MediaSummary> {
    items
        .into_iter()
        .filter(|item| item.date().is_some_and(|date| date <= today))
        .collect()
}

/// Kind to route an item to: its own media type when present, else the row's.
pub fn route_kind(row_kind: MediaKind, item: &MediaSummary) -> MediaKind {
    item.kind().unwrap_or(row_kind)
}

async fn load_row<F: RowFetcher>(
    fetcher: &F,
    store: &dyn KvStore,
    row: &Row,
) -> Result<Vec<MediaSummary>, ApiError> {
    match &row.source {
        RowSource::TrendingToday => fetcher.trending_today(row.kind).await,
        RowSource::Discover(params) => fetcher.discover(row.kind, &row.id, params).await,
        RowSource::Personalized => Ok(personalized(store, &row.id)),
    }
}

/// Loads all rows concurrently. Output order follows `rows`.
pub async fn load_rows<F: RowFetcher>(
    fetcher: &F,
    store: &dyn KvStore,
    rows: &[Row],
    today: &str,
) -> Vec<LoadedRow> {
    let loads = rows.iter().map(|row| async move {
        let items = match load_row(fetcher, store, row).await {
            Ok(items) => released_only(items, today),
            Err(e) => {
                warn!("Row {} failed to load: {}", row.id, e);
                Vec::new()
            }
        };
        LoadedRow {
            id: row.id.clone(),
            title: row.title.clone(),
            kind: row.kind,
            items,
        }
    });

    future::join_all(loads).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerCategory {
    TrendingInIndia,
    TrendingMovies,
    TrendingShows,
}

#[derive(Debug, Clone, Serialize)]
pub struct BannerSlide {
    pub kind: MediaKind,
    pub item: MediaSummary,
}

/// Weekly trending slides with anime left out, five per kind. Both lists are
/// fetched together and either failure fails the banner.
pub async fn load_banner<F: RowFetcher>(
    fetcher: &F,
    category: BannerCategory,
) -> Result<Vec<BannerSlide>, ApiError> {
    let (movies, shows) = future::try_join(
        fetcher.trending_week(MediaKind::Movie),
        fetcher.trending_week(MediaKind::Tv),
    )
    .await?;

    let slides = |items: Vec<MediaSummary>, kind: MediaKind| -> Vec<BannerSlide> {
        without_anime(items)
            .into_iter()
            .take(BANNER_SLIDES_PER_KIND)
            .map(|item| BannerSlide { kind, item })
            .collect()
    };

    let movie_slides = slides(movies, MediaKind::Movie);
    let show_slides = slides(shows, MediaKind::Tv);

    Ok(match category {
        BannerCategory::TrendingMovies => movie_slides,
        BannerCategory::TrendingShows => show_slides,
        BannerCategory::TrendingInIndia => movie_slides.into_iter().chain(show_slides).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    fn item(id: u64, date: Option<&str>) -> MediaSummary {
        MediaSummary {
            id,
            release_date: date.map(str::to_string),
            ..MediaSummary::default()
        }
    }

    /// Serves two dated items per row, except for rows listed in `failing`.
    #[derive(Default)]
    struct FakeFetcher {
        failing: HashSet<String>,
        trending_fails: bool,
    }

    impl RowFetcher for FakeFetcher {
        async fn trending_today(&self, _kind: MediaKind) -> Result<Vec<MediaSummary>, ApiError> {
            tokio::task::yield_now().await;
            if self.trending_fails {
                return Err(ApiError::RateLimited);
            }
            Ok(vec![item(1, Some("2024-01-01")), item(2, Some("2099-01-01"))])
        }

        async fn trending_week(&self, kind: MediaKind) -> Result<Vec<MediaSummary>, ApiError> {
            if self.trending_fails {
                return Err(ApiError::Upstream { status: 500 });
            }
            let base = if kind == MediaKind::Movie { 100 } else { 200 };
            let mut items: Vec<MediaSummary> = (0..8).map(|i| item(base + i, None)).collect();
            items[0].genre_ids = vec![16];
            items[0].original_language = Some("ja".to_string());
            Ok(items)
        }

        async fn discover(
            &self,
            _kind: MediaKind,
            cache_key: &str,
            _params: &DiscoverParams,
        ) -> Result<Vec<MediaSummary>, ApiError> {
            tokio::task::yield_now().await;
            if self.failing.contains(cache_key) {
                return Err(ApiError::Upstream { status: 503 });
            }
            Ok(vec![item(10, Some("2020-05-05")), item(11, None)])
        }
    }

    #[test]
    fn catalog_fills_relative_year_and_sorts_by_popularity() {
        let rows = catalog(2025);
        let indian = rows.iter().find(|r| r.id == "exciting-hindi-movies").unwrap();
        match &indian.source {
            RowSource::Discover(params) => {
                assert_eq!(params["primary_release_date.gte"], "2024-01-01");
                assert_eq!(params["sort_by"], "popularity.desc");
            }
            other => panic!("unexpected source {:?}", other),
        }

        let ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), rows.len(), "row ids must be unique");
    }

    #[test]
    fn pages_filter_rows() {
        let movies = rows_for_page(catalog(2025), Page::Movies);
        assert!(movies.iter().all(|r| r.kind == MediaKind::Movie));

        let new = rows_for_page(catalog(2025), Page::NewPopular);
        assert_eq!(new.len(), NEW_POPULAR_IDS.len());
    }

    #[tokio::test]
    async fn failing_rows_are_empty_and_others_populate() {
        let rows = rows_for_page(catalog(2025), Page::Home);
        let failing: HashSet<String> = ["us-movies", "tv-dramas", "sci-fi-shows"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let fetcher = FakeFetcher {
            failing: failing.clone(),
            trending_fails: false,
        };
        let store = MemoryStore::new();

        let loaded = load_rows(&fetcher, &store, &rows, "2025-06-01").await;

        assert_eq!(loaded.len(), rows.len());
        for (row, out) in rows.iter().zip(&loaded) {
            assert_eq!(row.id, out.id);
            match &row.source {
                RowSource::Discover(_) if failing.contains(&row.id) => {
                    assert!(out.items.is_empty())
                }
                RowSource::Discover(_) => {
                    // The undated item is filtered out.
                    assert_eq!(out.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![10]);
                }
                RowSource::TrendingToday => {
                    // The future-dated item is filtered out.
                    assert_eq!(out.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);
                }
                RowSource::Personalized => assert!(out.items.is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn trending_failure_only_empties_trending_rows() {
        let rows = rows_for_page(catalog(2025), Page::NewPopular);
        let fetcher = FakeFetcher {
            trending_fails: true,
            ..FakeFetcher::default()
        };
        let loaded = load_rows(&fetcher, &MemoryStore::new(), &rows, "2025-06-01").await;

        let populated = loaded.iter().filter(|r| !r.items.is_empty()).count();
        assert_eq!(populated, NEW_POPULAR_IDS.len() - 2);
    }

    #[tokio::test]
    async fn personalized_rows_read_from_store() {
        let store = MemoryStore::new();
        remember(&store, CONTINUE_WATCHING, item(5, Some("2001-01-01")));
        remember(&store, CONTINUE_WATCHING, item(6, Some("2002-01-01")));
        remember(&store, CONTINUE_WATCHING, item(5, Some("2001-01-01")));

        let rows: Vec<Row> = catalog(2025)
            .into_iter()
            .filter(|r| r.id == CONTINUE_WATCHING)
            .collect();
        let loaded = load_rows(&FakeFetcher::default(), &store, &rows, "2025-06-01").await;

        let ids: Vec<u64> = loaded[0].items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn corrupt_personalized_row_reads_empty() {
        let store = MemoryStore::new();
        store.set("because-you-watched", "{not json").unwrap();
        assert!(personalized(&store, "because-you-watched").is_empty());
    }

    #[test]
    fn released_only_compares_iso_dates() {
        let items = vec![
            item(1, Some("2025-06-01")),
            item(2, Some("2025-06-02")),
            item(3, Some("")),
        ];
        let ids: Vec<u64> = released_only(items, "2025-06-01").iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn route_kind_prefers_item_type() {
        let mut tv_item = item(1, None);
        tv_item.media_type = Some("tv".to_string());
        assert_eq!(route_kind(MediaKind::Movie, &tv_item), MediaKind::Tv);
        assert_eq!(route_kind(MediaKind::Movie, &item(2, None)), MediaKind::Movie);
    }

    #[tokio::test]
    async fn banner_skips_anime_and_caps_per_kind() {
        let fetcher = FakeFetcher::default();

        let both = load_banner(&fetcher, BannerCategory::TrendingInIndia).await.unwrap();
        assert_eq!(both.len(), 10);
        assert!(both.iter().all(|s| s.item.id != 100 && s.item.id != 200));

        let shows = load_banner(&fetcher, BannerCategory::TrendingShows).await.unwrap();
        assert!(shows.iter().all(|s| s.kind == MediaKind::Tv));
        assert_eq!(shows[0].item.id, 201);
    }

    #[tokio::test]
    async fn banner_fails_as_a_whole() {
        let fetcher = FakeFetcher {
            trending_fails: true,
            ..FakeFetcher::default()
        };
        assert!(load_banner(&fetcher, BannerCategory::TrendingMovies).await.is_err());
    }
}
