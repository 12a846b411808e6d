//! Session bookkeeping for all connected users.

use super::session::PlayerSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Cadence of the shared progress ticker.
pub const PROGRESS_TICK: Duration = Duration::from_millis(500);

/// Holds one [`PlayerSession`] per user, created lazily on first touch.
/// A single periodic task advances progress for every session, so there is
/// never more than one ticker to arm or cancel.
pub struct PlayerManager {
    sessions: Mutex<HashMap<usize, PlayerSession>>,
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerManager {
    pub fn new() -> Self {
        PlayerManager {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` against the user's session, creating it if needed.
    pub fn with_session<T>(&self, user_id: usize, f: impl FnOnce(&mut PlayerSession) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.entry(user_id).or_insert_with(|| {
            debug!("creating player session for user {}", user_id);
            PlayerSession::new()
        });
        f(session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Advances interpolated progress for every session.
    pub fn tick_progress(&self, elapsed: Duration) {
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.values_mut() {
            session.tick_progress(elapsed);
        }
    }

    /// Spawns the shared progress ticker. Called once next to the server,
    /// the returned handle aborts the loop on drop of the runtime.
    pub fn spawn_progress_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            // The first tick fires immediately, skip it so elapsed time is real.
            ticker.tick().await;
            let mut last = Instant::now();
            loop {
                ticker.tick().await;
                let now = Instant::now();
                manager.tick_progress(now - last);
                last = now;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Track;
    use crate::player::session::{PlaybackState, PlayerEvent};

    fn track(id: &str) -> Track {
        Track {
            video_id: id.to_string(),
            title: id.to_string(),
            thumbnail: String::new(),
        }
    }

    #[test]
    fn sessions_are_created_lazily_and_kept_apart() {
        let manager = PlayerManager::new();
        assert_eq!(manager.session_count(), 0);

        manager.with_session(1, |session| {
            session.surface_ready();
            session.set_track_list(vec![track("a")]);
            session.play_by_index(0);
        });
        manager.with_session(2, |session| {
            session.set_track_list(vec![track("b")]);
        });

        assert_eq!(manager.session_count(), 2);
        manager.with_session(1, |session| {
            assert_eq!(session.state(), PlaybackState::Loading);
        });
        manager.with_session(2, |session| {
            assert_eq!(session.state(), PlaybackState::Idle);
        });
    }

    #[test]
    fn tick_only_advances_playing_sessions() {
        let manager = PlayerManager::new();
        manager.with_session(1, |session| {
            session.surface_ready();
            session.set_track_list(vec![track("a")]);
            session.play_by_index(0);
            session.handle_event(PlayerEvent::Playing { duration: 100.0 });
        });
        manager.with_session(2, |session| {
            session.surface_ready();
            session.set_track_list(vec![track("b")]);
            session.play_by_index(0);
            session.handle_event(PlayerEvent::Playing { duration: 100.0 });
            session.handle_event(PlayerEvent::Paused);
        });

        manager.tick_progress(Duration::from_secs(10));

        manager.with_session(1, |session| {
            assert!((session.progress_percent() - 10.0).abs() < 0.01);
        });
        manager.with_session(2, |session| {
            assert_eq!(session.progress_percent(), 0.0);
        });
    }
}
