// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use std::time::Duration;
use tokio::time::Instant;

/// Where the player sits when not fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dock {
    /// Covers the whole viewport.
    Overlay,
    /// Tracks an inline slot on the details page.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Fullscreen,
    Overlay,
    Docked,
}

/// What the close button should do in the current chrome state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    ExitFullscreen,
    /// Tear down and stay on the page.
    StopInline,
    /// Tear down and go back.
    NavigateBack,
}

/// Controls overlay, episode list, fullscreen and rotation state.
#[derive(Debug, Clone)]
pub struct Chrome {
    hide_after: Duration,
    hide_at: Option<Instant>,
    controls_visible: bool,
    episode_list_open: bool,
    fullscreen: bool,
    rotated: bool,
    dock: Dock,
}

impl Chrome {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            hide_after,
            hide_at: None,
            controls_visible: false,
            episode_list_open: false,
            fullscreen: false,
            rotated: false,
            dock: Dock::Overlay,
        }
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible || self.episode_list_open
    }

    pub fn episode_list_open(&self) -> bool {
        self.episode_list_open
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    pub fn dock(&self) -> Dock {
        self.dock
    }

    pub fn set_dock(&mut self, dock: Dock) {
        self.dock = dock;
    }

    pub fn placement(&self) -> Placement {
        match (self.fullscreen, self.dock) {
            (true, _) => Placement::Fullscreen,
            (false, Dock::Inline) => Placement::Docked,
            (false, Dock::Overlay) => Placement::Overlay,
        }
    }

    /// Shows the controls and restarts the auto-hide countdown.
    pub fn show_controls(&mut self, now: Instant) {
        self.controls_visible = true;
        self.hide_at = Some(now + self.hide_after);
    }

    pub fn open_episode_list(&mut self) {
        self.episode_list_open = true;
        self.controls_visible = true;
        self.hide_at = None;
    }

    pub fn close_episode_list(&mut self, now: Instant) {
        self.episode_list_open = false;
        self.show_controls(now);
    }

    /// Auto-hides the controls once the countdown passes. The episode list
    /// holds them open.
    pub fn tick(&mut self, now: Instant) {
        if self.episode_list_open {
            return;
        }
        if self.hide_at.is_some_and(|at| now >= at) {
            self.controls_visible = false;
            self.hide_at = None;
        }
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        if !self.fullscreen {
            self.rotated = false;
        }
        self.fullscreen
    }

    /// Manual landscape rotation for devices without an orientation lock.
    pub fn toggle_rotation(&mut self) -> bool {
        self.rotated = !self.rotated;
        self.rotated
    }

    pub fn close_action(&self) -> CloseAction {
        if self.fullscreen {
            CloseAction::ExitFullscreen
        } else if self.dock == Dock::Inline {
            CloseAction::StopInline
        } else {
            CloseAction::NavigateBack
        }
    }

    pub fn on_visibility(&mut self, visible: bool, now: Instant) {
        if visible {
            self.show_controls(now);
        } else {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.fullscreen = false;
        self.rotated = false;
        self.controls_visible = false;
        self.episode_list_open = false;
        self.hide_at = None;
    }
}
