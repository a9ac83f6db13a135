// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, spinner};
use anyhow::Result;
use reelcache::clock;
use reelcache::media::MediaKind;
use reelcache::player::{FIRST_SEASON, PlaybackSession, SessionManager, Transition};
use reelcache::rows::{CONTINUE_WATCHING, remember};
use reelcache::tmdb::MediaSummary;
use serde_json::json;

pub struct WatchCommand {
    pub kind: MediaKind,
    pub id: u64,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub format: OutputFormat,
}

impl WatchCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let mut manager = SessionManager::new(&context.config.player, clock::system())?;

        let pb = spinner("Preparing player...");
        let transition = manager.open(&context.tmdb, self.id, self.kind).await;
        if transition == Transition::NavigateAway {
            pb.finish_and_clear();
            anyhow::bail!("Could not load {} {}", self.kind, self.id);
        }

        if let Some(season) = self.season.filter(|s| *s != FIRST_SEASON) {
            pb.set_message(format!("Loading season {}...", season));
            let transition = manager.switch_season(&context.tmdb, season).await;
            if matches!(transition, Ok(Transition::NavigateAway)) {
                pb.finish_and_clear();
                anyhow::bail!("Could not load season {} of {}", season, self.id);
            }
            transition?;
        }
        pb.finish_and_clear();

        if let Some(episode) = self.episode {
            manager.select_episode(episode)?;
        }

        let Some(session) = manager.session() else {
            anyhow::bail!("No player session for {} {}", self.kind, self.id);
        };
        self.remember(&context, session).await;

        match self.format {
            OutputFormat::Json => print_json(&json!({
                "id": session.media_id,
                "kind": session.kind,
                "title": session.title,
                "season": session.selected_season,
                "episode": session.selected_episode,
                "url": session.embed_url,
            }))?,
            OutputFormat::Text => {
                match session.episode_target() {
                    Some((season, episode)) => {
                        println!("{} S{:02}E{:02}", session.title, season, episode)
                    }
                    None => println!("{}", session.title),
                }
                println!("{}", session.embed_url);
            }
        }
        Ok(())
    }

    /// Adds the title to the continue-watching row.
    async fn remember(&self, context: &CommandContext, session: &PlaybackSession) {
        let Ok(details) = context.tmdb.details(session.kind, session.media_id).await else {
            return;
        };
        let item = MediaSummary {
            id: details.id,
            title: details.title,
            name: details.name,
            media_type: Some(session.kind.as_str().to_string()),
            overview: details.overview,
            poster_path: details.poster_path,
            backdrop_path: details.backdrop_path,
            vote_average: details.vote_average,
            release_date: details.release_date,
            first_air_date: details.first_air_date,
            original_language: details.original_language,
            genres: details.genres,
            ..Default::default()
        };
        remember(context.store(), CONTINUE_WATCHING, item);
    }
}
