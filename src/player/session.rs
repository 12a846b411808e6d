//! Per-user playback session.
//!
//! Owns the current track list, the playback state machine and the auto-skip
//! circuit breaker. The session never talks to the embedding surface
//! directly: commands for it are queued in an outbox and drained by the
//! state poll, events reported by the surface come back through
//! [`PlayerSession::handle_event`].

use crate::catalog::Track;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// After this many playback errors in a row the session stops skipping and
/// goes terminal. Keeps a track list of systematically non-embeddable videos
/// from being burned through automatically.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Message key surfaced to the client when the circuit breaker trips.
pub const NO_PLAYABLE_TRACK_MESSAGE: &str = "no_playable_track";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    /// Terminal until the next manual selection.
    Stopped,
}

/// Commands for the embedding surface, drained in order by the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SurfaceCommand {
    Load { video_id: String },
    Stop,
    Seek { seconds: f64 },
    SetRate { rate: f64 },
}

/// Events reported by the embedding surface.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    Playing { duration: f64 },
    Paused,
    Ended,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub track_count: usize,
    pub position: f64,
    pub duration: f64,
    pub progress_percent: f64,
    pub playback_rate: f64,
    pub surface_hidden: bool,
    pub terminal_message: Option<&'static str>,
}

pub struct PlayerSession {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    state: PlaybackState,
    surface_ready: bool,
    /// At most one parked load while the surface is not ready, last write
    /// wins. Taken exactly once when the ready signal arrives.
    pending_load: Option<usize>,
    consecutive_errors: u32,
    position: f64,
    duration: f64,
    playback_rate: f64,
    surface_hidden: bool,
    terminal_message: Option<&'static str>,
    outbox: Vec<SurfaceCommand>,
}

impl Default for PlayerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerSession {
    pub fn new() -> Self {
        PlayerSession {
            tracks: Vec::new(),
            current_index: None,
            state: PlaybackState::Idle,
            surface_ready: false,
            pending_load: None,
            consecutive_errors: 0,
            position: 0.0,
            duration: 0.0,
            playback_rate: 1.0,
            surface_hidden: true,
            terminal_message: None,
            outbox: Vec::new(),
        }
    }

    /// Replaces the track list wholesale. Every search or browse action
    /// rebuilds the list, the last caller wins. Being a manual action this
    /// also clears a tripped breaker.
    pub fn set_track_list(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current_index = None;
        self.pending_load = None;
        self.consecutive_errors = 0;
        if self.state == PlaybackState::Stopped {
            self.state = PlaybackState::Idle;
            self.terminal_message = None;
        }
    }

    /// Starts playback of the track at `index`. Out of range indices are
    /// ignored, leaving all playback state untouched.
    pub fn play_by_index(&mut self, index: usize) {
        if index >= self.tracks.len() {
            warn!(
                "ignoring out-of-range track index {} (list has {} entries)",
                index,
                self.tracks.len()
            );
            return;
        }
        // Manual selection resets the breaker.
        self.consecutive_errors = 0;
        self.terminal_message = None;
        self.load(index);
    }

    fn load(&mut self, index: usize) {
        self.current_index = Some(index);
        if !self.surface_ready {
            debug!("surface not ready, parking load of track index {}", index);
            self.pending_load = Some(index);
            return;
        }
        let video_id = self.tracks[index].video_id.clone();
        debug!("loading track index {}: {}", index, video_id);
        self.position = 0.0;
        self.duration = 0.0;
        self.state = PlaybackState::Loading;
        self.surface_hidden = false;
        self.outbox.push(SurfaceCommand::Load { video_id });
    }

    /// Called once the embedding surface reports it can accept loads.
    /// Resolves a parked load exactly once.
    pub fn surface_ready(&mut self) {
        self.surface_ready = true;
        if let Some(index) = self.pending_load.take() {
            debug!("surface ready, replaying parked load of index {}", index);
            self.load(index);
        }
    }

    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Playing { duration } => {
                self.state = PlaybackState::Playing;
                // A successful play also resets the breaker.
                self.consecutive_errors = 0;
                self.duration = duration.max(0.0);
            }
            PlayerEvent::Paused => {
                if self.state == PlaybackState::Playing || self.state == PlaybackState::Loading {
                    self.state = PlaybackState::Paused;
                }
            }
            PlayerEvent::Ended => {
                self.state = PlaybackState::Ended;
                self.position = self.duration;
            }
            PlayerEvent::Error => self.handle_error(),
        }
    }

    fn handle_error(&mut self) {
        if self.state == PlaybackState::Stopped {
            // Terminal, only a manual action restarts playback.
            return;
        }
        let current = match self.current_index {
            Some(index) => index,
            None => return,
        };

        self.consecutive_errors += 1;
        error!(
            "playback error on track index {} ({}/{})",
            current, self.consecutive_errors, MAX_CONSECUTIVE_ERRORS
        );

        if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
            error!("too many consecutive playback errors, stopping playback");
            self.state = PlaybackState::Stopped;
            self.surface_hidden = true;
            self.terminal_message = Some(NO_PLAYABLE_TRACK_MESSAGE);
            self.outbox.push(SurfaceCommand::Stop);
            return;
        }

        if current + 1 < self.tracks.len() {
            debug!("auto-skipping to track index {}", current + 1);
            self.load(current + 1);
        } else {
            warn!("end of track list reached, nothing left to skip to");
            self.state = PlaybackState::Idle;
            self.surface_hidden = true;
            self.outbox.push(SurfaceCommand::Stop);
        }
    }

    pub fn play_next(&mut self) {
        if let Some(index) = self.current_index {
            if index + 1 < self.tracks.len() {
                self.play_by_index(index + 1);
            } else {
                debug!("already at the end of the track list");
            }
        }
    }

    pub fn play_prev(&mut self) {
        if let Some(index) = self.current_index {
            if index > 0 {
                self.play_by_index(index - 1);
            } else {
                debug!("already at the start of the track list");
            }
        }
    }

    /// Seeks to `fraction` of the duration, where the fraction is the click
    /// offset over the progress bar width computed by the client. Ignored
    /// unless the surface is ready and a duration is known.
    pub fn seek(&mut self, fraction: f64) {
        if !self.surface_ready || self.duration <= 0.0 || !fraction.is_finite() {
            return;
        }
        let target = (self.duration * fraction).clamp(0.0, self.duration);
        self.position = target;
        self.outbox.push(SurfaceCommand::Seek { seconds: target });
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.25, 2.0);
        self.playback_rate = rate;
        self.outbox.push(SurfaceCommand::SetRate { rate });
    }

    /// Advances the interpolated position while playing. Driven by the
    /// manager's single progress ticker, so exiting `Playing` deterministically
    /// stops the advance.
    pub fn tick_progress(&mut self, elapsed: Duration) {
        if self.state != PlaybackState::Playing || self.duration <= 0.0 {
            return;
        }
        self.position =
            (self.position + elapsed.as_secs_f64() * self.playback_rate).min(self.duration);
    }

    pub fn progress_percent(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.position / self.duration) * 100.0
    }

    /// Drains the queued surface commands in order.
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state,
            current_index: self.current_index,
            current_track: self
                .current_index
                .and_then(|index| self.tracks.get(index))
                .cloned(),
            track_count: self.tracks.len(),
            position: self.position,
            duration: self.duration,
            progress_percent: self.progress_percent(),
            playback_rate: self.playback_rate,
            surface_hidden: self.surface_hidden,
            terminal_message: self.terminal_message,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }
}
