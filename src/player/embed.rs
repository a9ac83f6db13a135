// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use url::Url;

/// Builds embed URLs for the third-party player.
#[derive(Debug, Clone)]
pub struct EmbedUrlBuilder {
    base: Url,
}

impl EmbedUrlBuilder {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid embed base URL: {}", base))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Embed base URL cannot have path segments: {}", base);
        }
        Ok(Self { base })
    }

    /// `base/{id}` for movies, `base/{id}/{season}/{episode}` for episodes.
    pub fn build(&self, media_id: u64, episode: Option<(u32, u32)>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(&media_id.to_string());
            if let Some((season, episode)) = episode {
                segments.push(&season.to_string());
                segments.push(&episode.to_string());
            }
        }
        url.query_pairs_mut()
            .append_pair("autoplay", "1")
            .append_pair("sidebar", "0")
            .append_pair("mix", "0");
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_and_episode_urls() {
        let embed = EmbedUrlBuilder::new("https://cinemaos.tech/player").unwrap();
        assert_eq!(
            embed.build(550, None),
            "https://cinemaos.tech/player/550?autoplay=1&sidebar=0&mix=0"
        );
        assert_eq!(
            embed.build(1399, Some((2, 5))),
            "https://cinemaos.tech/player/1399/2/5?autoplay=1&sidebar=0&mix=0"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_tolerated() {
        let embed = EmbedUrlBuilder::new("https://example.com/embed/").unwrap();
        assert_eq!(
            embed.build(1, None),
            "https://example.com/embed/1?autoplay=1&sidebar=0&mix=0"
        );
    }

    #[test]
    fn rejects_non_urls() {
        assert!(EmbedUrlBuilder::new("not a url").is_err());
        assert!(EmbedUrlBuilder::new("mailto:someone@example.com").is_err());
    }
}
