//! Test server lifecycle management
//!
//! Each test gets an isolated server on a random port, wired to its own
//! stub upstream catalog, temp database and recording mailer.

use super::constants::*;
use super::fixtures::{default_videos, RecordingMailer, StubCatalogServer, StubVideo};
use hsound_server::catalog::{CatalogService, CatalogSettings, YouTubeCatalog};
use hsound_server::library::JsonLibraryStore;
use hsound_server::player::PlayerManager;
use hsound_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use hsound_server::user::{SqliteUserStore, UserManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated upstream, database and library.
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// User manager for direct store access in tests
    pub user_manager: Arc<UserManager>,

    /// Captures password reset tokens
    pub mailer: RecordingMailer,

    /// The stub upstream the catalog client talks to
    pub stub_catalog: StubCatalogServer,

    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server backed by the default three-video stub catalog.
    pub async fn spawn() -> Self {
        Self::spawn_with_videos(default_videos()).await
    }

    /// Spawns a server whose stub catalog serves the given videos.
    pub async fn spawn_with_videos(videos: Vec<StubVideo>) -> Self {
        let stub_catalog = StubCatalogServer::spawn(videos).await;
        let upstream_url = stub_catalog.base_url.clone();
        Self::spawn_inner(stub_catalog, upstream_url, true).await
    }

    /// Spawns a server pointed at an unreachable upstream, for failure tests.
    pub async fn spawn_with_dead_upstream() -> Self {
        let stub_catalog = StubCatalogServer::spawn(default_videos()).await;
        let upstream_url = super::fixtures::unreachable_base_url().await;
        Self::spawn_inner(stub_catalog, upstream_url, true).await
    }

    /// Spawns a server with the embeddability filter disabled.
    pub async fn spawn_without_embeddable_filter(videos: Vec<StubVideo>) -> Self {
        let stub_catalog = StubCatalogServer::spawn(videos).await;
        let upstream_url = stub_catalog.base_url.clone();
        Self::spawn_inner(stub_catalog, upstream_url, false).await
    }

    async fn spawn_inner(
        stub_catalog: StubCatalogServer,
        upstream_url: String,
        filter_embeddable: bool,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let user_store = Arc::new(
            SqliteUserStore::new(temp_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );
        let user_manager = Arc::new(UserManager::new(user_store));
        user_manager
            .register(TEST_USER, TEST_EMAIL, TEST_PASS)
            .expect("Failed to register fixture user");

        let youtube = YouTubeCatalog::new(upstream_url, "test-api-key".to_string())
            .expect("Failed to build catalog client");
        let catalog = Arc::new(CatalogService::new(
            Arc::new(youtube),
            CatalogSettings {
                filter_embeddable,
                ..CatalogSettings::default()
            },
        ));

        let library = Arc::new(JsonLibraryStore::new(temp_dir.path().join("library.json")));
        let mailer = RecordingMailer::default();
        let player_manager = Arc::new(PlayerManager::new());
        // Real progress interpolation in e2e tests.
        player_manager.spawn_progress_ticker();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            frontend_dir_path: None,
        };

        let app = make_app(
            config,
            catalog,
            user_manager.clone(),
            player_manager,
            library,
            Arc::new(mailer.clone()),
            None,
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_manager,
            mailer,
            stub_catalog,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to answer on its home route.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
