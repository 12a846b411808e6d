use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hsound_server::catalog::{CatalogService, YouTubeCatalog};
use hsound_server::config::{AppConfig, CliConfig, FileConfig};
use hsound_server::library::JsonLibraryStore;
use hsound_server::mailer::LogMailer;
use hsound_server::player::PlayerManager;
use hsound_server::server::{run_server, AudioResolver, RequestsLoggingLevel};
use hsound_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file for user storage.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to the saved-track library JSON file.
    /// Defaults to library.json next to the user database.
    #[clap(long, value_parser = parse_path)]
    pub library_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Video catalog API key. Falls back to the YOUTUBE_API_KEY environment
    /// variable.
    #[clap(long)]
    pub api_key: Option<String>,

    /// Base URL of the video catalog API.
    #[clap(long)]
    pub catalog_url: Option<String>,

    /// URL of the resolver service that turns video ids into audio streams.
    /// Without it, GET /play/{videoId} is unavailable.
    #[clap(long)]
    pub resolver_url: Option<String>,

    /// Connect timeout in seconds for resolver requests.
    #[clap(long, default_value_t = 10)]
    pub resolver_connect_timeout_sec: u64,

    /// Region code for the trending chart.
    #[clap(long, default_value = "TR")]
    pub region: String,

    /// Category id for the trending chart (10 is music).
    #[clap(long, default_value = "10")]
    pub category: String,

    /// Page size for catalog queries.
    #[clap(long, default_value_t = 15)]
    pub max_results: usize,

    /// Skip the per-video embeddability check. Saves one upstream round trip
    /// per query but lets non-embeddable videos into the results.
    #[clap(long)]
    pub skip_embeddable_check: bool,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Optional TOML config file. File values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_path: cli_args.db_path,
        library_path: cli_args.library_path,
        port: cli_args.port,
        api_key: cli_args
            .api_key
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok()),
        catalog_url: cli_args.catalog_url,
        resolver_url: cli_args.resolver_url,
        resolver_connect_timeout_sec: cli_args.resolver_connect_timeout_sec,
        region: cli_args.region,
        category: cli_args.category,
        max_results: cli_args.max_results,
        skip_embeddable_check: cli_args.skip_embeddable_check,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
    };

    // Fails fast on an unusable setup, most notably a missing API key.
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening user database at {:?}...", config.db_path);
    let user_store = Arc::new(SqliteUserStore::new(&config.db_path)?);
    let user_manager = Arc::new(UserManager::new(user_store));

    let youtube = YouTubeCatalog::new(config.catalog_url.clone(), config.api_key.clone())
        .map_err(|err| anyhow::anyhow!("{}", err))?;
    let catalog = Arc::new(CatalogService::new(
        Arc::new(youtube),
        config.catalog_settings(),
    ));

    let library = Arc::new(JsonLibraryStore::new(config.library_path.clone()));
    info!("Library file at {:?}", config.library_path);

    let mailer = Arc::new(LogMailer::new(format!("http://localhost:{}", config.port)));

    let resolver = match &config.resolver_url {
        Some(url) => {
            info!("Audio resolver configured at {}", url);
            Some(Arc::new(AudioResolver::new(
                url.clone(),
                config.resolver_connect_timeout_sec,
            )?))
        }
        None => {
            info!("No audio resolver configured, /play streaming is disabled");
            None
        }
    };

    let player_manager = Arc::new(PlayerManager::new());

    info!("Ready to serve at port {}!", config.port);
    run_server(
        config.server_config(),
        catalog,
        user_manager,
        player_manager,
        library,
        mailer,
        resolver,
    )
    .await
}
