//! YouTube Data API v3 client.
//!
//! Speaks the search, trending and status endpoints and maps their envelopes
//! to [`Track`]. The response mapping is kept in pure functions so it can be
//! tested against canned payloads without a network.

use super::{CatalogClient, CatalogError, Track};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

const DEFAULT_TIMEOUT_SEC: u64 = 10;

pub struct YouTubeCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeCatalog {
    pub fn new(base_url: String, api_key: String) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SEC))
            .build()
            .map_err(|err| CatalogError::Upstream(err.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| CatalogError::Upstream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Upstream(format!(
                "{} responded with status {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|err| CatalogError::Upstream(format!("invalid {} response: {}", path, err)))
    }
}

#[async_trait]
impl CatalogClient for YouTubeCatalog {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Track>, CatalogError> {
        let max_results = max_results.to_string();
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("q", query),
                    ("maxResults", &max_results),
                ],
            )
            .await?;
        Ok(map_search_items(response))
    }

    async fn popular(
        &self,
        region: &str,
        category: &str,
        max_results: usize,
    ) -> Result<Vec<Track>, CatalogError> {
        let max_results = max_results.to_string();
        let response: VideosResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet"),
                    ("chart", "mostPopular"),
                    ("regionCode", region),
                    ("videoCategoryId", category),
                    ("maxResults", &max_results),
                ],
            )
            .await?;
        Ok(map_video_items(response))
    }

    async fn embeddable_ids(&self, ids: &[String]) -> Result<HashSet<String>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let joined = ids.join(",");
        let response: VideosResponse = self
            .get_json("videos", &[("part", "status"), ("id", &joined)])
            .await?;
        Ok(map_embeddable_ids(response))
    }
}

// The subset of the API envelopes this server reads. Everything else in the
// payload is ignored on purpose.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    status: Option<VideoStatus>,
}

#[derive(Debug, Deserialize)]
struct VideoStatus {
    #[serde(default)]
    embeddable: bool,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

fn snippet_to_track(video_id: String, snippet: Snippet) -> Track {
    let thumbnail = snippet
        .thumbnails
        .and_then(|t| t.default)
        .map(|t| t.url)
        .unwrap_or_default();
    Track {
        video_id,
        title: snippet.title,
        thumbnail,
    }
}

/// Search results may contain channels and playlists, those carry no video id
/// and are skipped.
fn map_search_items(response: SearchResponse) -> Vec<Track> {
    response
        .items
        .into_iter()
        .filter_map(|item| match (item.id.video_id, item.snippet) {
            (Some(video_id), Some(snippet)) => Some(snippet_to_track(video_id, snippet)),
            _ => None,
        })
        .collect()
}

fn map_video_items(response: VideosResponse) -> Vec<Track> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            item.snippet
                .map(|snippet| snippet_to_track(item.id, snippet))
        })
        .collect()
}

fn map_embeddable_ids(response: VideosResponse) -> HashSet<String> {
    response
        .items
        .into_iter()
        .filter(|item| item.status.as_ref().map(|s| s.embeddable).unwrap_or(false))
        .map(|item| item.id)
        .collect()
}
