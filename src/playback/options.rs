// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Playback configuration.

use serde::Serialize;

/// Default prefetch window ahead of the play head, in bag seconds.
pub const DEFAULT_PREFETCH_SECONDS: f64 = 10.0;

/// Default playback speed multiplier.
pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;

/// Whether playback loops back to the start by default.
pub const DEFAULT_LOOP_PLAYBACK: bool = true;

/// Playback options, applied on the next tick after an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackOptions {
    /// How far ahead of the play head chunks are prefetched, in bag seconds
    pub prefetch_seconds: f64,
    /// Bag-time seconds advanced per wall-clock second
    pub playback_speed: f64,
    /// Snap back to the start when the play head reaches the end
    pub loop_playback: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            prefetch_seconds: DEFAULT_PREFETCH_SECONDS,
            playback_speed: DEFAULT_PLAYBACK_SPEED,
            loop_playback: DEFAULT_LOOP_PLAYBACK,
        }
    }
}

impl PlaybackOptions {
    /// Set the prefetch window.
    pub fn with_prefetch_seconds(mut self, seconds: f64) -> Self {
        self.prefetch_seconds = seconds;
        self
    }

    /// Set the speed multiplier.
    pub fn with_playback_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed;
        self
    }

    /// Set loop-at-end behavior.
    pub fn with_loop_playback(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    /// Merge a partial update onto these options.
    pub fn apply(&mut self, update: PlaybackOptionsUpdate) {
        if let Some(prefetch_seconds) = update.prefetch_seconds {
            self.prefetch_seconds = prefetch_seconds;
        }
        if let Some(playback_speed) = update.playback_speed {
            self.playback_speed = playback_speed;
        }
        if let Some(loop_playback) = update.loop_playback {
            self.loop_playback = loop_playback;
        }
    }
}

/// A partial options update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackOptionsUpdate {
    /// New prefetch window, if set
    pub prefetch_seconds: Option<f64>,
    /// New speed multiplier, if set
    pub playback_speed: Option<f64>,
    /// New loop behavior, if set
    pub loop_playback: Option<bool>,
}

impl PlaybackOptionsUpdate {
    /// Update only the speed multiplier.
    pub fn speed(playback_speed: f64) -> Self {
        Self {
            playback_speed: Some(playback_speed),
            ..Self::default()
        }
    }

    /// Update only the loop behavior.
    pub fn loop_playback(loop_playback: bool) -> Self {
        Self {
            loop_playback: Some(loop_playback),
            ..Self::default()
        }
    }
}
