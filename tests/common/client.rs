//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with a cookie store and one method per server endpoint.
//! When routes or request shapes change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle the session cookie
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as the fixture user.
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /register
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/register", self.base_url))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// POST /forgot-password
    pub async fn forgot_password(&self, email: &str) -> Response {
        self.client
            .post(format!("{}/forgot-password", self.base_url))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Forgot password request failed")
    }

    /// POST /reset-password
    pub async fn reset_password(&self, token: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/reset-password", self.base_url))
            .json(&json!({ "token": token, "password": password }))
            .send()
            .await
            .expect("Reset password request failed")
    }

    // ========================================================================
    // Catalog Endpoints
    // ========================================================================

    /// GET /search?q=...
    pub async fn search(&self, query: &str) -> Response {
        self.client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)])
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /search without a query parameter
    pub async fn search_without_query(&self) -> Response {
        self.client
            .get(format!("{}/search", self.base_url))
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /popular
    pub async fn popular(&self) -> Response {
        self.client
            .get(format!("{}/popular", self.base_url))
            .send()
            .await
            .expect("Popular request failed")
    }

    /// GET /play/{videoId}
    pub async fn play(&self, video_id: &str) -> Response {
        self.client
            .get(format!("{}/play/{}", self.base_url, video_id))
            .send()
            .await
            .expect("Play request failed")
    }

    // ========================================================================
    // Player Endpoints
    // ========================================================================

    /// POST /player/queue
    pub async fn player_queue(&self, tracks: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/player/queue", self.base_url))
            .json(&json!({ "tracks": tracks }))
            .send()
            .await
            .expect("Player queue request failed")
    }

    /// POST /player/play/{index}
    pub async fn player_play(&self, index: usize) -> Response {
        self.client
            .post(format!("{}/player/play/{}", self.base_url, index))
            .send()
            .await
            .expect("Player play request failed")
    }

    /// POST /player/next
    pub async fn player_next(&self) -> Response {
        self.client
            .post(format!("{}/player/next", self.base_url))
            .send()
            .await
            .expect("Player next request failed")
    }

    /// POST /player/prev
    pub async fn player_prev(&self) -> Response {
        self.client
            .post(format!("{}/player/prev", self.base_url))
            .send()
            .await
            .expect("Player prev request failed")
    }

    /// POST /player/ready
    pub async fn player_ready(&self) -> Response {
        self.client
            .post(format!("{}/player/ready", self.base_url))
            .send()
            .await
            .expect("Player ready request failed")
    }

    /// POST /player/event
    pub async fn player_event(&self, event: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/player/event", self.base_url))
            .json(&event)
            .send()
            .await
            .expect("Player event request failed")
    }

    /// POST /player/seek
    pub async fn player_seek(&self, fraction: f64) -> Response {
        self.client
            .post(format!("{}/player/seek", self.base_url))
            .json(&json!({ "fraction": fraction }))
            .send()
            .await
            .expect("Player seek request failed")
    }

    /// POST /player/rate
    pub async fn player_rate(&self, rate: f64) -> Response {
        self.client
            .post(format!("{}/player/rate", self.base_url))
            .json(&json!({ "rate": rate }))
            .send()
            .await
            .expect("Player rate request failed")
    }

    /// GET /player/state
    pub async fn player_state(&self) -> Response {
        self.client
            .get(format!("{}/player/state", self.base_url))
            .send()
            .await
            .expect("Player state request failed")
    }

    // ========================================================================
    // Library Endpoints
    // ========================================================================

    /// GET /library
    pub async fn library_list(&self) -> Response {
        self.client
            .get(format!("{}/library", self.base_url))
            .send()
            .await
            .expect("Library list request failed")
    }

    /// PUT /library
    pub async fn library_add(&self, track: serde_json::Value) -> Response {
        self.client
            .put(format!("{}/library", self.base_url))
            .json(&track)
            .send()
            .await
            .expect("Library add request failed")
    }

    /// DELETE /library/{videoId}
    pub async fn library_remove(&self, video_id: &str) -> Response {
        self.client
            .delete(format!("{}/library/{}", self.base_url, video_id))
            .send()
            .await
            .expect("Library remove request failed")
    }

    /// GET /library/{videoId}
    pub async fn library_contains(&self, video_id: &str) -> Response {
        self.client
            .get(format!("{}/library/{}", self.base_url, video_id))
            .send()
            .await
            .expect("Library contains request failed")
    }
}
