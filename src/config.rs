use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const MAX_NUMBERED_KEYS: usize = 9;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub polygon: PolygonConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolygonConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
    #[serde(default = "default_true")]
    pub adjusted: bool,
    #[serde(skip)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Trading days fetched when a symbol is first added.
    #[serde(default = "default_historical_window")]
    pub historical_window: usize,
    /// Upper bound on in-flight quote requests; 0 disables the bound.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_window")]
    pub window: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_base_url() -> String {
    "https://api.polygon.io".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/stonk.sqlite")
}

fn default_historical_window() -> usize {
    100
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_analysis_window() -> usize {
    80
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            rate_limit_cooldown_secs: default_cooldown_secs(),
            adjusted: true,
            api_keys: Vec::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            historical_window: default_historical_window(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: default_analysis_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Trim and uppercase a ticker, rejecting empty input.
pub fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() || ticker.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidTicker(raw.to_string()));
    }
    Ok(ticker)
}

/// Collect API keys from a comma-separated list plus numbered variables,
/// dropping blanks and duplicates while keeping first-seen order.
pub fn collect_api_keys<'a>(
    list: Option<&'a str>,
    numbered: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let listed = list.into_iter().flat_map(|s| s.split(','));
    for key in listed.chain(numbered) {
        let key = key.trim();
        if !key.is_empty() && !out.iter().any(|k| k == key) {
            out.push(key.to_string());
        }
    }
    out
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("STONK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(&config_path)?;

        let list = std::env::var("POLYGON_IO_KEYS").ok();
        let numbered: Vec<String> = (1..=MAX_NUMBERED_KEYS)
            .filter_map(|i| std::env::var(format!("POLYGON_IO_KEY_{}", i)).ok())
            .collect();
        config.polygon.api_keys =
            collect_api_keys(list.as_deref(), numbered.iter().map(String::as_str));

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sync.historical_window == 0 {
            bail!("sync.historical_window must be > 0");
        }
        if self.analysis.window < 2 {
            bail!("analysis.window must be >= 2");
        }
        if self.polygon.base_url.trim().is_empty() {
            bail!("polygon.base_url must not be empty");
        }
        url::Url::parse(&self.polygon.base_url)
            .with_context(|| format!("polygon.base_url '{}' is invalid", self.polygon.base_url))?;
        Ok(())
    }
}
