mod file_config;

pub use file_config::FileConfig;

use crate::catalog::CatalogSettings;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that take part in config resolution. TOML file values
/// override these where present.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub library_path: Option<PathBuf>,
    pub port: u16,
    pub api_key: Option<String>,
    pub catalog_url: Option<String>,
    pub resolver_url: Option<String>,
    pub resolver_connect_timeout_sec: u64,
    pub region: String,
    pub category: String,
    pub max_results: usize,
    pub skip_embeddable_check: bool,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

pub const DEFAULT_CATALOG_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub library_path: PathBuf,
    pub port: u16,
    pub api_key: String,
    pub catalog_url: String,
    pub resolver_url: Option<String>,
    pub resolver_connect_timeout_sec: u64,
    pub region: String,
    pub category: String,
    pub max_results: usize,
    pub filter_embeddable: bool,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present. An absent catalog API
    /// key is a hard startup error, the server is useless without one.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in the config file")
            })?;

        let library_path = file
            .library_path
            .map(PathBuf::from)
            .or_else(|| cli.library_path.clone())
            .unwrap_or_else(|| {
                db_path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("library.json")
            });

        let api_key = match file.api_key.or_else(|| cli.api_key.clone()) {
            Some(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "A video catalog API key is required: pass --api-key, set YOUTUBE_API_KEY or \
                 put api_key in the config file"
            ),
        };

        let port = file.port.unwrap_or(cli.port);

        let catalog_url = file
            .catalog_url
            .or_else(|| cli.catalog_url.clone())
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let resolver_url = file.resolver_url.or_else(|| cli.resolver_url.clone());
        let resolver_connect_timeout_sec = file
            .resolver_connect_timeout_sec
            .unwrap_or(cli.resolver_connect_timeout_sec);

        let region = file.region.unwrap_or_else(|| cli.region.clone());
        let category = file.category.unwrap_or_else(|| cli.category.clone());
        let max_results = file.max_results.unwrap_or(cli.max_results);
        if max_results == 0 {
            bail!("max_results must be at least 1");
        }

        let filter_embeddable = file
            .filter_embeddable
            .unwrap_or(!cli.skip_embeddable_check);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        if let Some(dir) = &frontend_dir_path {
            if !PathBuf::from(dir).is_dir() {
                bail!("Frontend directory does not exist: {}", dir);
            }
        }

        Ok(Self {
            db_path,
            library_path,
            port,
            api_key,
            catalog_url,
            resolver_url,
            resolver_connect_timeout_sec,
            region,
            category,
            max_results,
            filter_embeddable,
            logging_level,
            frontend_dir_path,
        })
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            region: self.region.clone(),
            category: self.category.clone(),
            max_results: self.max_results,
            filter_embeddable: self.filter_embeddable,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

/// Parses a logging level string via clap's ValueEnum trait.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
