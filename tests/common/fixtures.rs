//! Test fixtures: the stub upstream catalog and a recording mailer.
//!
//! The stub catalog speaks just enough of the YouTube Data API wire shape
//! for the real `YouTubeCatalog` client to talk to it over loopback.

use super::constants::*;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use hsound_server::mailer::Mailer;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct StubVideo {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub embeddable: bool,
    pub trending: bool,
}

pub fn stub_video(id: &str, title: &str) -> StubVideo {
    StubVideo {
        id: id.to_string(),
        title: title.to_string(),
        thumbnail: format!("http://thumbs.example/{}.jpg", id),
        embeddable: true,
        trending: true,
    }
}

pub fn default_videos() -> Vec<StubVideo> {
    vec![
        stub_video(VIDEO_1_ID, VIDEO_1_TITLE),
        stub_video(VIDEO_2_ID, VIDEO_2_TITLE),
        stub_video(VIDEO_3_ID, VIDEO_3_TITLE),
    ]
}

#[derive(Clone)]
struct StubState {
    videos: Arc<Vec<StubVideo>>,
    status_calls: Arc<AtomicUsize>,
}

fn video_snippet(video: &StubVideo) -> serde_json::Value {
    json!({
        "title": video.title,
        "thumbnails": { "default": { "url": video.thumbnail } }
    })
}

async fn stub_search(
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let q = params
        .get("q")
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let max: usize = params
        .get("maxResults")
        .and_then(|v| v.parse().ok())
        .unwrap_or(15);

    let items: Vec<serde_json::Value> = state
        .videos
        .iter()
        .filter(|v| q.is_empty() || v.title.to_lowercase().contains(&q))
        .take(max)
        .map(|v| {
            json!({
                "id": { "kind": "youtube#video", "videoId": v.id },
                "snippet": video_snippet(v)
            })
        })
        .collect();

    Json(json!({ "kind": "youtube#searchListResponse", "items": items }))
}

async fn stub_videos(
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("chart").map(String::as_str) == Some("mostPopular") {
        let max: usize = params
            .get("maxResults")
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        let items: Vec<serde_json::Value> = state
            .videos
            .iter()
            .filter(|v| v.trending)
            .take(max)
            .map(|v| json!({ "id": v.id, "snippet": video_snippet(v) }))
            .collect();
        return Json(json!({ "items": items }));
    }

    // part=status lookup for the embeddability filter.
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    let requested: Vec<&str> = params
        .get("id")
        .map(|ids| ids.split(',').collect())
        .unwrap_or_default();
    let items: Vec<serde_json::Value> = state
        .videos
        .iter()
        .filter(|v| requested.contains(&v.id.as_str()))
        .map(|v| json!({ "id": v.id, "status": { "embeddable": v.embeddable } }))
        .collect();
    Json(json!({ "items": items }))
}

/// A loopback stand-in for the external catalog API.
pub struct StubCatalogServer {
    pub base_url: String,
    status_calls: Arc<AtomicUsize>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubCatalogServer {
    pub async fn spawn(videos: Vec<StubVideo>) -> Self {
        let status_calls = Arc::new(AtomicUsize::new(0));
        let state = StubState {
            videos: Arc::new(videos),
            status_calls: status_calls.clone(),
        };

        let app = Router::new()
            .route("/search", get(stub_search))
            .route("/videos", get(stub_videos))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub catalog port");
        let port = listener.local_addr().expect("No local address").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Stub catalog server failed");
        });

        Self {
            base_url,
            status_calls,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// How many embeddability status lookups the server received.
    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl Drop for StubCatalogServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Mailer that records reset tokens instead of delivering them, so tests can
/// complete the reset flow.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingMailer {
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Mailer for RecordingMailer {
    fn send_password_reset(&self, email: &str, token_value: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token_value.to_string()));
    }
}

/// Binds and immediately drops a loopback listener, yielding a base URL that
/// refuses connections. Used to simulate upstream outage.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway port");
    let port = listener.local_addr().expect("No local address").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
