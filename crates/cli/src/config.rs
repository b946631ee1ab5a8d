//! CLI configuration
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! `AUTOBID_*` environment variables (nested keys use `__`, for example
//! `AUTOBID_CLIENT__BASE_URL`).

use anyhow::Result;
use autobid_http::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5064/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub client: ClientConfig,

    /// Overrides the default data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::new(DEFAULT_BASE_URL),
            data_dir: None,
        }
    }
}

impl CliConfig {
    /// Load configuration, layering `file` (if given) and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("client.base_url", defaults.client.base_url)?
            .set_default("client.timeout_secs", defaults.client.timeout_secs)?
            .set_default("client.user_agent", defaults.client.user_agent)?;
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("AUTOBID")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Pick the data directory: the flag, then the config, then the default
    pub fn resolve_data_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }
}

/// `$AUTOBID_STATE_DIR`, else the platform data directory
pub fn default_data_dir() -> PathBuf {
    if let Ok(state_dir) = std::env::var("AUTOBID_STATE_DIR") {
        PathBuf::from(state_dir)
    } else {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autobid")
    }
}
