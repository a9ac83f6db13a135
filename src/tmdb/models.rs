// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::media::MediaKind;
use serde::{Deserialize, Serialize};

const ANIMATION_GENRE: u32 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// A list item from trending, discover, search or recommendation endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl MediaSummary {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Untitled")
    }

    /// Release date for movies, first air date for shows. Empty strings count as missing.
    pub fn date(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.first_air_date.as_deref().filter(|d| !d.is_empty()))
    }

    pub fn kind(&self) -> Option<MediaKind> {
        match self.media_type.as_deref() {
            Some("movie") => Some(MediaKind::Movie),
            Some("tv") => Some(MediaKind::Tv),
            _ => None,
        }
    }

    /// Japanese-language animation.
    pub fn is_anime(&self) -> bool {
        let animated = self.genre_ids.contains(&ANIMATION_GENRE)
            || self.genres.iter().any(|g| g.id == ANIMATION_GENRE);
        animated && self.original_language.as_deref() == Some("ja")
    }
}

pub fn without_anime(items: Vec<MediaSummary>) -> Vec<MediaSummary> {
    items.into_iter().filter(|item| !item.is_anime()).collect()
}

/// Search results can include people; keep only movies and shows.
pub fn only_titles(items: Vec<MediaSummary>) -> Vec<MediaSummary> {
    items.into_iter().filter(|item| item.kind().is_some()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
    #[serde(default)]
    pub credits: Option<Credits>,
}

impl MediaDetails {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Untitled")
    }

    pub fn runtime_minutes(&self) -> Option<u32> {
        self.runtime.or(self.episode_run_time.first().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default)]
    pub id: u64,
    pub episode_number: u32,
    #[serde(default)]
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonDetails {
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(json: serde_json::Value) -> MediaSummary {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn anime_needs_animation_and_japanese() {
        let anime = summary(serde_json::json!({
            "id": 1, "genre_ids": [16, 10759], "original_language": "ja"
        }));
        let cartoon = summary(serde_json::json!({
            "id": 2, "genre_ids": [16], "original_language": "en"
        }));
        let detail_style = summary(serde_json::json!({
            "id": 3, "genres": [{"id": 16, "name": "Animation"}], "original_language": "ja"
        }));

        assert!(anime.is_anime());
        assert!(!cartoon.is_anime());
        assert!(detail_style.is_anime());

        let kept = without_anime(vec![anime, cartoon, detail_style]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 2);
    }

    #[test]
    fn search_results_drop_people() {
        let items = vec![
            summary(serde_json::json!({"id": 1, "media_type": "movie", "title": "A"})),
            summary(serde_json::json!({"id": 2, "media_type": "person", "name": "B"})),
            summary(serde_json::json!({"id": 3, "media_type": "tv", "name": "C"})),
        ];
        let ids: Vec<u64> = only_titles(items).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn date_prefers_release_and_skips_empty() {
        let movie = summary(serde_json::json!({"id": 1, "release_date": "2024-05-01"}));
        let show = summary(serde_json::json!({
            "id": 2,
            "release_date": "",
            "first_air_date": "2020-01-01"
        }));
        let undated = summary(serde_json::json!({"id": 3}));

        assert_eq!(movie.date(), Some("2024-05-01"));
        assert_eq!(show.date(), Some("2020-01-01"));
        assert_eq!(undated.date(), None);
    }

    #[test]
    fn details_keep_specials_in_season_list() {
        let details: MediaDetails = serde_json::from_value(serde_json::json!({
            "id": 1399,
            "name": "Show",
            "seasons": [{"season_number": 0}, {"season_number": 1}, {"season_number": 2}]
        }))
        .unwrap();
        let seasons: Vec<u32> = details.seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(seasons, vec![0, 1, 2]);
        assert_eq!(details.display_title(), "Show");
    }
}
