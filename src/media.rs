// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Normalized content kind shared by both providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// Accepts route-style names. `anime` is an episodic show.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" | "movies" => Ok(Self::Movie),
            "tv" | "show" | "shows" | "series" | "anime" => Ok(Self::Tv),
            _ => anyhow::bail!("Invalid media kind: {}. Use 'movie' or 'tv'", s),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    pub fn is_episodic(&self) -> bool {
        matches!(self, MediaKind::Tv)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Today's date as `YYYY-MM-DD`, the format both APIs use for release dates.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
