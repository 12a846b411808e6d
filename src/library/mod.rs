//! Saved-track library.
//!
//! The whole library is one JSON document rewritten on every mutation, the
//! file-backed analogue of the browser's persistent key/value store. No
//! indexing; the list is small and a tab-equivalent mutates it serially.

use crate::catalog::Track;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

pub trait LibraryStore: Send + Sync {
    /// Adds a track. A track with the same video id already present makes
    /// this a no-op.
    fn add(&self, track: Track) -> Result<()>;

    /// Removes a track by video id. Absent ids make this a no-op.
    fn remove(&self, video_id: &str) -> Result<()>;

    fn contains(&self, video_id: &str) -> Result<bool>;

    /// All saved tracks in insertion order.
    fn all(&self) -> Result<Vec<Track>>;
}

pub struct JsonLibraryStore {
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLibraryStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Vec<Track>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Could not read library file {:?}", self.file_path))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Library file {:?} is not valid JSON", self.file_path))
    }

    fn write(&self, tracks: &[Track]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create library directory {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(tracks)?;
        fs::write(&self.file_path, content)
            .with_context(|| format!("Could not write library file {:?}", self.file_path))
    }
}

impl LibraryStore for JsonLibraryStore {
    fn add(&self, track: Track) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut tracks = self.read()?;
        if tracks.iter().any(|t| t.video_id == track.video_id) {
            debug!("track {} already in library", track.video_id);
            return Ok(());
        }
        tracks.push(track);
        self.write(&tracks)
    }

    fn remove(&self, video_id: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut tracks = self.read()?;
        let before = tracks.len();
        tracks.retain(|t| t.video_id != video_id);
        if tracks.len() == before {
            return Ok(());
        }
        self.write(&tracks)
    }

    fn contains(&self, video_id: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read()?.iter().any(|t| t.video_id == video_id))
    }

    fn all(&self) -> Result<Vec<Track>> {
        let _guard = self.lock.lock().unwrap();
        self.read()
    }
}
