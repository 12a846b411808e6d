use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration file. Every field mirrors a CLI argument and,
/// when present, overrides it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub library_path: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub catalog_url: Option<String>,
    pub resolver_url: Option<String>,
    pub resolver_connect_timeout_sec: Option<u64>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub max_results: Option<usize>,
    pub filter_embeddable: Option<bool>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file {:?}", path.as_ref()))?;
        toml::from_str(&content)
            .with_context(|| format!("Could not parse config file {:?}", path.as_ref()))
    }
}
