//! Optional config file loading. Search order: ./novelsrc.toml, then
//! $XDG_CONFIG_HOME/novelsrc/config.toml (or ~/.config/novelsrc/config.toml).

use crate::engine::PaginationPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in milliseconds between requests.
    pub request_delay_ms: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Extra headers sent with every request (e.g. `Accept-Language`).
    pub headers: BTreeMap<String, String>,
    pub pagination: PaginationConfig,
}

/// `[pagination]` table: retry tuning for chapter lists.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PaginationConfig {
    /// Backoff before retry n is base_delay_secs * n.
    pub base_delay_secs: Option<u64>,
    /// Stop after more than this many failed fetches in a row.
    pub max_consecutive_failures: Option<u32>,
    /// Pause in milliseconds between successful pages.
    pub page_pause_ms: Option<u64>,
}

impl PaginationConfig {
    /// Default policy with the keys present in this table applied.
    pub fn policy(&self) -> PaginationPolicy {
        let mut policy = PaginationPolicy::default();
        if let Some(s) = self.base_delay_secs {
            policy.base_delay = Duration::from_secs(s);
        }
        if let Some(n) = self.max_consecutive_failures {
            policy.max_consecutive_failures = n;
        }
        if let Some(ms) = self.page_pause_ms {
            policy.page_pause = Duration::from_millis(ms);
        }
        policy
    }
}

/// Search order: (1) ./novelsrc.toml, (2) $XDG_CONFIG_HOME/novelsrc/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("novelsrc.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("novelsrc").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "config loaded");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
