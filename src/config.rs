use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub export: ExportConfig,
}

/// Parameters for the review endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub num_per_page: u32,
    /// Only honoured by the API for some filter modes
    pub day_range: u32,
    pub filter: String,
    pub review_type: String,
    pub purchase_type: String,
    /// Send `language=all` instead of omitting the parameter
    pub send_all_language: bool,
    /// Upper bound accepted for a caller's page limit
    pub max_pages_ceiling: u32,
    /// Page count treated as "done" for progress when no estimate is known
    pub progress_page_hint: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://store.steampowered.com".to_string(),
            timeout_secs: 10,
            num_per_page: 100,
            day_range: 365,
            filter: "recent".to_string(),
            review_type: "all".to_string(),
            purchase_type: "all".to_string(),
            send_all_language: false,
            max_pages_ceiling: 500,
            progress_page_hint: 50,
        }
    }
}

/// Export output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Load configuration from the default location (.review-export/config.yml)
    pub fn load_default() -> Result<Self> {
        Self::load(".review-export/config.yml")
    }

    /// Reject values that would make the fetch loop meaningless
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be positive");
        }
        if self.api.num_per_page == 0 {
            anyhow::bail!("api.num_per_page must be positive");
        }
        if self.api.max_pages_ceiling == 0 {
            anyhow::bail!("api.max_pages_ceiling must be positive");
        }
        Ok(())
    }
}
