// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, print_summary, spinner};
use anyhow::Result;
use reelcache::media::MediaKind;
use reelcache::tmdb::{MediaDetails, SeasonDetails, without_anime};

pub struct TrendingCommand {
    pub kind: MediaKind,
    pub today: bool,
    pub refresh: bool,
    pub no_anime: bool,
    pub format: OutputFormat,
}

impl TrendingCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let window = if self.today { "today" } else { "this week" };
        let pb = spinner(&format!("Loading trending {} {}...", self.kind, window));
        let result = if self.today {
            context.tmdb.trending_today(self.kind, self.refresh).await
        } else {
            context.tmdb.trending_week(self.kind, self.refresh).await
        };
        pb.finish_and_clear();

        let mut items = result?;
        if self.no_anime {
            items = without_anime(items);
        }

        match self.format {
            OutputFormat::Json => print_json(&items)?,
            OutputFormat::Text => {
                println!("Trending {} {}:", self.kind, window);
                for item in &items {
                    print_summary(item);
                }
            }
        }
        Ok(())
    }
}

pub struct DetailsCommand {
    pub kind: MediaKind,
    pub id: u64,
    pub format: OutputFormat,
}

impl DetailsCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let pb = spinner("Loading details...");
        let result = context.tmdb.details(self.kind, self.id).await;
        pb.finish_and_clear();
        let details = result?;

        match self.format {
            OutputFormat::Json => print_json(&details)?,
            OutputFormat::Text => print_details(&details),
        }
        Ok(())
    }
}

fn print_details(details: &MediaDetails) {
    println!("{} ({})", details.display_title(), details.id);

    let date = details
        .release_date
        .as_deref()
        .or(details.first_air_date.as_deref())
        .unwrap_or("unknown");
    println!("  Released: {}", date);

    if let Some(minutes) = details.runtime_minutes() {
        println!("  Runtime:  {} min", minutes);
    }
    if let Some(seasons) = details.number_of_seasons {
        println!("  Seasons:  {}", seasons);
    }
    if !details.genres.is_empty() {
        let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
        println!("  Genres:   {}", genres.join(", "));
    }
    if let Some(credits) = &details.credits {
        let cast: Vec<&str> = credits.cast.iter().take(5).map(|c| c.name.as_str()).collect();
        if !cast.is_empty() {
            println!("  Cast:     {}", cast.join(", "));
        }
    }
    if let Some(overview) = details.overview.as_deref().filter(|o| !o.is_empty()) {
        println!();
        println!("{}", overview);
    }
}

pub struct SeasonCommand {
    pub id: u64,
    pub season: u32,
    pub format: OutputFormat,
}

impl SeasonCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let pb = spinner(&format!("Loading season {}...", self.season));
        let result = context.tmdb.season(self.id, self.season).await;
        pb.finish_and_clear();
        let season = result?;

        match self.format {
            OutputFormat::Json => print_json(&season)?,
            OutputFormat::Text => print_season(&season),
        }
        Ok(())
    }
}

fn print_season(season: &SeasonDetails) {
    let name = season
        .name
        .clone()
        .unwrap_or_else(|| format!("Season {}", season.season_number));
    println!("{} ({} episodes)", name, season.episodes.len());
    for episode in &season.episodes {
        println!(
            "  {:>3}. {}",
            episode.episode_number,
            episode.name.as_deref().unwrap_or("Untitled")
        );
    }
}

pub struct RecsCommand {
    pub kind: MediaKind,
    pub id: u64,
    pub format: OutputFormat,
}

impl RecsCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let pb = spinner("Loading recommendations...");
        let result = context.tmdb.recommendations(self.kind, self.id).await;
        pb.finish_and_clear();
        let items = result?;

        match self.format {
            OutputFormat::Json => print_json(&items)?,
            OutputFormat::Text => {
                if items.is_empty() {
                    println!("No recommendations for {} {}", self.kind, self.id);
                }
                for item in &items {
                    print_summary(item);
                }
            }
        }
        Ok(())
    }
}
