//! Audio streaming proxy.
//!
//! `GET /play/{videoId}` does not touch the upstream video site directly: a
//! separate resolver service turns a video id into an audio byte stream and
//! this handler pipes it through with an `audio/mpeg` content type.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::error;

use super::state::OptionalResolver;

/// Video ids are eleven URL-safe base64 characters.
static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_-]{11}$").expect("static regex"));

pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_RE.is_match(id)
}

/// HTTP client for the external audio resolver service.
pub struct AudioResolver {
    client: reqwest::Client,
    base_url: String,
}

impl AudioResolver {
    pub fn new(base_url: String, connect_timeout_sec: u64) -> Result<Self> {
        // No total timeout: audio responses are long-lived streams.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_sec))
            .build()
            .context("Failed to create resolver HTTP client")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_audio(&self, video_id: &str) -> Result<reqwest::Response> {
        let url = format!("{}/audio/{}", self.base_url, video_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to audio resolver")?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Resolver answered status {} for video {}",
                response.status(),
                video_id
            );
        }
        Ok(response)
    }
}

pub async fn stream_audio(
    State(resolver): State<OptionalResolver>,
    Path(video_id): Path<String>,
) -> Response {
    if !is_valid_video_id(&video_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid video ID." })),
        )
            .into_response();
    }

    let resolver = match resolver {
        Some(resolver) => resolver,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Audio streaming is not configured." })),
            )
                .into_response()
        }
    };

    match resolver.fetch_audio(&video_id).await {
        Ok(upstream) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "audio/mpeg")
            .body(Body::from_stream(upstream.bytes_stream()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(err) => {
            error!("audio proxy failed for {}: {}", video_id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to process video." })),
            )
                .into_response()
        }
    }
}
