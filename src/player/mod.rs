// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Single-slot playback session for the embedded web player.
//!
//! At most one title is ever loaded. Loads are split into `start` and
//! `complete` so a slow fetch for a title the user already navigated away
//! from can be recognised by its ticket and dropped.

pub mod chrome;
pub mod embed;
pub mod idle;

pub use chrome::{Chrome, CloseAction, Dock, Placement};
pub use embed::EmbedUrlBuilder;
pub use idle::IdleTimer;

use crate::clock::Clock;
use crate::config::PlayerConfig;
use crate::error::ApiError;
use crate::media::MediaKind;
use crate::tmdb::{Episode, MediaDetails, SeasonDetails};
use anyhow::{Result, anyhow, bail};
use futures_util::future::try_join;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Season opened when an episodic title is first loaded.
pub const FIRST_SEASON: u32 = 1;

/// Metadata the player needs to build a session.
pub trait MetadataSource {
    fn fetch_details(
        &self,
        kind: MediaKind,
        id: u64,
    ) -> impl Future<Output = Result<MediaDetails, ApiError>>;

    fn fetch_season(
        &self,
        id: u64,
        season_number: u32,
    ) -> impl Future<Output = Result<SeasonDetails, ApiError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub media_id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub selected_season: Option<u32>,
    pub selected_episode: Option<u32>,
    /// Episodes of the selected season.
    pub episodes: Vec<Episode>,
    pub embed_url: String,
    pub last_used_ms: i64,
    loaded_seasons: BTreeMap<u32, Vec<Episode>>,
}

impl PlaybackSession {
    fn new(media_id: u64, kind: MediaKind, details: &MediaDetails) -> Self {
        Self {
            media_id,
            kind,
            title: details.display_title().to_string(),
            selected_season: None,
            selected_episode: None,
            episodes: Vec::new(),
            embed_url: String::new(),
            last_used_ms: 0,
            loaded_seasons: BTreeMap::new(),
        }
    }

    pub fn has_season(&self, season: u32) -> bool {
        self.loaded_seasons.contains_key(&season)
    }

    pub fn episode_target(&self) -> Option<(u32, u32)> {
        self.selected_season.zip(self.selected_episode)
    }

    fn show_season(&mut self, season: u32, episodes: Vec<Episode>) {
        self.selected_episode = Some(episodes.first().map(|e| e.episode_number).unwrap_or(1));
        self.selected_season = Some(season);
        self.loaded_seasons.insert(season, episodes.clone());
        self.episodes = episodes;
    }

    fn refresh(&mut self, embed: &EmbedUrlBuilder, now_ms: i64) {
        self.embed_url = embed.build(self.media_id, self.episode_target());
        self.last_used_ms = now_ms;
    }
}

/// Identifies one load. Only the most recently issued ticket can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    media_id: u64,
}

impl LoadTicket {
    pub fn media_id(&self) -> u64 {
        self.media_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadTarget {
    Title,
    /// Season switch. The session is restored with the new season on success.
    Season {
        season: u32,
        session: Box<PlaybackSession>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub media_id: u64,
    pub kind: MediaKind,
    pub target: LoadTarget,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerState {
    Idle,
    Loading(LoadRequest),
    Ready(PlaybackSession),
}

impl PlayerState {
    pub fn media_id(&self) -> Option<u64> {
        match self {
            PlayerState::Idle => None,
            PlayerState::Loading(request) => Some(request.media_id),
            PlayerState::Ready(session) => Some(session.media_id),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PlayerState::Loading(_))
    }
}

#[derive(Debug, Clone)]
pub enum LoadedMedia {
    Title {
        details: MediaDetails,
        season: Option<SeasonDetails>,
    },
    Season(SeasonDetails),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ready,
    /// The requested title was already active. Nothing was fetched.
    Unchanged,
    /// The result belonged to a load that has since been superseded.
    Stale,
    /// Loading failed. The caller should leave the player route.
    NavigateAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonSwitch {
    Switched,
    Pending(LoadTicket),
}

/// Fetches details, plus the first season's episodes for episodic titles.
pub async fn load_title<S: MetadataSource>(
    source: &S,
    media_id: u64,
    kind: MediaKind,
) -> Result<LoadedMedia, ApiError> {
    if kind.is_episodic() {
        let (details, season) = try_join(
            source.fetch_details(kind, media_id),
            source.fetch_season(media_id, FIRST_SEASON),
        )
        .await?;
        Ok(LoadedMedia::Title {
            details,
            season: Some(season),
        })
    } else {
        let details = source.fetch_details(kind, media_id).await?;
        Ok(LoadedMedia::Title {
            details,
            season: None,
        })
    }
}

#[derive(Debug)]
pub struct SessionManager {
    state: PlayerState,
    generation: u64,
    embed: EmbedUrlBuilder,
    idle: IdleTimer,
    chrome: Chrome,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(config: &PlayerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            state: PlayerState::Idle,
            generation: 0,
            embed: EmbedUrlBuilder::new(&config.embed_base_url)?,
            idle: IdleTimer::new(config.idle_timeout()),
            chrome: Chrome::new(config.controls_hide()),
            clock,
        })
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        match &self.state {
            PlayerState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn chrome(&self) -> &Chrome {
        &self.chrome
    }

    pub fn chrome_mut(&mut self) -> &mut Chrome {
        &mut self.chrome
    }

    fn next_ticket(&mut self, media_id: u64) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            media_id,
        }
    }

    /// Begins loading a title, discarding whatever session was active.
    /// Returns `None` when the title is already loading or loaded.
    pub fn start(&mut self, media_id: u64, kind: MediaKind) -> Option<LoadTicket> {
        match &mut self.state {
            PlayerState::Ready(session)
                if session.media_id == media_id && session.kind == kind =>
            {
                session.last_used_ms = self.clock.now_ms();
                debug!("Player session for {} {} reused", kind, media_id);
                return None;
            }
            PlayerState::Loading(request)
                if request.media_id == media_id && request.kind == kind =>
            {
                return None;
            }
            _ => {}
        }

        if let Some(previous) = self.state.media_id() {
            debug!("Discarding player session for {}", previous);
        }

        let ticket = self.next_ticket(media_id);
        self.state = PlayerState::Loading(LoadRequest {
            media_id,
            kind,
            target: LoadTarget::Title,
            generation: ticket.generation,
        });
        Some(ticket)
    }

    /// Applies the result of a load started by `start` or `select_season`.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedMedia, ApiError>,
    ) -> Transition {
        let current = matches!(
            &self.state,
            PlayerState::Loading(request) if request.generation == ticket.generation
        );
        if !current {
            debug!("Ignoring stale load result for {}", ticket.media_id);
            return Transition::Stale;
        }

        let PlayerState::Loading(request) = std::mem::replace(&mut self.state, PlayerState::Idle)
        else {
            return Transition::Stale;
        };

        match self.build_session(request, result) {
            Ok(session) => {
                info!("Player ready: {}", session.embed_url);
                self.state = PlayerState::Ready(session);
                Transition::Ready
            }
            Err(e) => {
                warn!("Failed to load player for {}: {}", ticket.media_id, e);
                self.chrome.reset();
                Transition::NavigateAway
            }
        }
    }

    fn build_session(
        &self,
        request: LoadRequest,
        result: Result<LoadedMedia, ApiError>,
    ) -> Result<PlaybackSession> {
        let loaded = result?;
        let now = self.clock.now_ms();

        let mut session = match (request.target, loaded) {
            (LoadTarget::Title, LoadedMedia::Title { details, season }) => {
                let mut session = PlaybackSession::new(request.media_id, request.kind, &details);
                if request.kind.is_episodic() {
                    let season = season
                        .ok_or_else(|| anyhow!("No episode list for {}", request.media_id))?;
                    session.show_season(FIRST_SEASON, season.episodes);
                }
                session
            }
            (LoadTarget::Season { season, session }, LoadedMedia::Season(details)) => {
                let mut session = *session;
                session.show_season(season, details.episodes);
                session
            }
            _ => bail!("Load result does not match request for {}", request.media_id),
        };

        session.refresh(&self.embed, now);
        Ok(session)
    }

    /// Starts and completes a title load in one step.
    pub async fn open<S: MetadataSource>(
        &mut self,
        source: &S,
        media_id: u64,
        kind: MediaKind,
    ) -> Transition {
        let Some(ticket) = self.start(media_id, kind) else {
            return Transition::Unchanged;
        };
        let result = load_title(source, media_id, kind).await;
        self.complete(ticket, result)
    }

    pub fn select_episode(&mut self, episode: u32) -> Result<&PlaybackSession> {
        let PlayerState::Ready(session) = &mut self.state else {
            bail!("No active player session");
        };
        if !session.kind.is_episodic() {
            bail!("{} has no episodes", session.title);
        }
        if !session.episodes.is_empty()
            && !session.episodes.iter().any(|e| e.episode_number == episode)
        {
            bail!(
                "Episode {} not found in season {}",
                episode,
                session.selected_season.unwrap_or(FIRST_SEASON)
            );
        }

        session.selected_episode = Some(episode);
        session.refresh(&self.embed, self.clock.now_ms());
        Ok(session)
    }

    /// Switches season. Already-loaded seasons switch immediately; others
    /// put the manager back into `Loading` until the ticket completes.
    pub fn select_season(&mut self, season: u32) -> Result<SeasonSwitch> {
        let (media_id, kind, loaded) = match &self.state {
            PlayerState::Ready(session) => {
                (session.media_id, session.kind, session.has_season(season))
            }
            _ => bail!("No active player session"),
        };
        if !kind.is_episodic() {
            bail!("Title {} has no seasons", media_id);
        }

        if loaded {
            if let PlayerState::Ready(session) = &mut self.state
                && let Some(episodes) = session.loaded_seasons.get(&season).cloned()
            {
                session.show_season(season, episodes);
                session.refresh(&self.embed, self.clock.now_ms());
            }
            return Ok(SeasonSwitch::Switched);
        }

        let ticket = self.next_ticket(media_id);
        if let PlayerState::Ready(session) = std::mem::replace(&mut self.state, PlayerState::Idle)
        {
            self.state = PlayerState::Loading(LoadRequest {
                media_id,
                kind,
                target: LoadTarget::Season {
                    season,
                    session: Box::new(session),
                },
                generation: ticket.generation,
            });
        }
        Ok(SeasonSwitch::Pending(ticket))
    }

    /// `select_season` followed by the fetch when one is needed.
    pub async fn switch_season<S: MetadataSource>(
        &mut self,
        source: &S,
        season: u32,
    ) -> Result<Transition> {
        match self.select_season(season)? {
            SeasonSwitch::Switched => Ok(Transition::Ready),
            SeasonSwitch::Pending(ticket) => {
                let result = source
                    .fetch_season(ticket.media_id, season)
                    .await
                    .map(LoadedMedia::Season);
                Ok(self.complete(ticket, result))
            }
        }
    }

    /// Releases the session. Returns whether anything was active.
    pub fn close(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, PlayerState::Idle);
        self.chrome.reset();
        if let Some(media_id) = previous.media_id() {
            debug!("Released player session for {}", media_id);
            true
        } else {
            false
        }
    }

    /// Handles the close button. Fullscreen is exited first; otherwise the
    /// session is released.
    pub fn close_requested(&mut self) -> CloseAction {
        let action = self.chrome.close_action();
        match action {
            CloseAction::ExitFullscreen => {
                self.chrome.toggle_fullscreen();
            }
            CloseAction::StopInline | CloseAction::NavigateBack => {
                self.close();
            }
        }
        action
    }

    /// The idle timer runs only while the player route is showing.
    pub fn set_route_active(&mut self, active: bool, now: Instant) {
        if active {
            self.idle.arm(now);
            self.chrome.on_visibility(true, now);
        } else {
            self.idle.clear();
            self.chrome.on_visibility(false, now);
        }
    }

    /// User interaction. Pushes the idle deadline out and shows controls.
    pub fn on_activity(&mut self, now: Instant) {
        if self.idle.is_armed() {
            self.idle.arm(now);
        }
        self.chrome.show_controls(now);
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle.deadline()
    }

    /// Resolves when the idle deadline passes. Follow with `poll_idle`.
    pub async fn wait_idle(&self) {
        self.idle.expired().await
    }

    /// Tears the session down if the idle deadline has passed.
    pub fn poll_idle(&mut self, now: Instant) -> bool {
        if !self.idle.is_expired(now) {
            return false;
        }
        self.idle.clear();
        if self.close() {
            info!("Player idle timeout reached, session released");
        }
        true
    }
}
