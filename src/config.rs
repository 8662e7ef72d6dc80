use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

pub const ENV_API_URL: &str = "FACELENS_API_URL";
pub const ENV_HISTORY_LIMIT: &str = "FACELENS_HISTORY_LIMIT";
pub const ENV_POLL_INTERVAL_MS: &str = "FACELENS_POLL_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    /// Rows requested for the history sidebar
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_history_limit() -> u32 {
    DEFAULT_HISTORY_LIMIT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    pub fn config_dir() -> Option<PathBuf> {
        let home = env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".facelens"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("facelens.log"))
    }

    pub fn load() -> Option<Config> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return None;
        }

        let contents = fs::read_to_string(&config_path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Apply `FACELENS_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(limit) = lookup(ENV_HISTORY_LIMIT) {
            match limit.trim().parse() {
                Ok(n) => self.history_limit = n,
                Err(_) => tracing::warn!(value = %limit, "invalid {}", ENV_HISTORY_LIMIT),
            }
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            match ms.trim().parse::<u64>() {
                Ok(n) if n > 0 => self.poll_interval_ms = n,
                _ => tracing::warn!(value = %ms, "invalid {}", ENV_POLL_INTERVAL_MS),
            }
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Save the config to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let config_dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }
}

/// Check that `raw` is an absolute http(s) URL, returning it without a trailing slash
pub fn validate_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Server URL is required".to_string());
    }
    let url = reqwest::Url::parse(trimmed).map_err(|e| format!("Invalid URL: {}", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Unsupported scheme: {}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
