mod youtube;

pub use youtube::YouTubeCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// One playable entry of the external video catalog.
///
/// Tracks are immutable and sourced fresh from every catalog query, nothing
/// here is persisted server side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub thumbnail: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("upstream catalog request failed: {0}")]
    Upstream(String),
}

/// External video catalog. Implemented over the YouTube Data API in
/// production and stubbed out in tests.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Free text search, at most `max_results` entries. An empty result is
    /// not an error.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Track>, CatalogError>;

    /// The region/category trending chart, same shape as search.
    async fn popular(
        &self,
        region: &str,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<Track>, CatalogError>;

    /// Returns the subset of `ids` whose videos may be embedded in a third
    /// party page.
    async fn embeddable_ids(&self, ids: &[String]) -> Result<HashSet<String>, CatalogError>;
}

/// Settings for the catalog pass-through.
#[derive(Clone, Debug)]
pub struct CatalogSettings {
    pub region: String,
    pub category: String,
    pub max_results: usize,
    /// When set, search and popular results are restricted to embeddable
    /// videos at the cost of one extra upstream round trip.
    pub filter_embeddable: bool,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            region: "TR".to_string(),
            category: "10".to_string(),
            max_results: 15,
            filter_embeddable: true,
        }
    }
}

/// Best-effort pass-through in front of a [`CatalogClient`]: no caching, no
/// pagination, no retries. Each call is a single upstream query plus the
/// optional embeddability check.
pub struct CatalogService {
    client: Arc<dyn CatalogClient>,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(client: Arc<dyn CatalogClient>, settings: CatalogSettings) -> Self {
        let settings = CatalogSettings {
            max_results: settings.max_results.clamp(1, 25),
            ..settings
        };
        Self { client, settings }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError> {
        let tracks = self
            .client
            .search(query, self.settings.max_results)
            .await?;
        self.apply_embeddable_filter(tracks).await
    }

    pub async fn popular(&self) -> Result<Vec<Track>, CatalogError> {
        let tracks = self
            .client
            .popular(
                &self.settings.region,
                &self.settings.category,
                self.settings.max_results,
            )
            .await?;
        self.apply_embeddable_filter(tracks).await
    }

    async fn apply_embeddable_filter(
        &self,
        tracks: Vec<Track>,
    ) -> Result<Vec<Track>, CatalogError> {
        if !self.settings.filter_embeddable || tracks.is_empty() {
            return Ok(tracks);
        }

        let ids: Vec<String> = tracks.iter().map(|t| t.video_id.clone()).collect();
        let embeddable = self.client.embeddable_ids(&ids).await?;

        let before = tracks.len();
        let filtered: Vec<Track> = tracks
            .into_iter()
            .filter(|t| embeddable.contains(&t.video_id))
            .collect();
        if filtered.len() < before {
            debug!(
                "embeddability filter dropped {} of {} results",
                before - filtered.len(),
                before
            );
        }
        Ok(filtered)
    }
}
