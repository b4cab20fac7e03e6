//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.nexus/config.json`) and environment.
//! It holds operator defaults only; values the user changes at runtime (server URL,
//! model selection) live in the settings store (see [`crate::settings`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_STREAMLIT_URL: &str = "http://localhost:8501";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend API defaults (URL, timeouts).
    #[serde(default)]
    pub api: ApiConfig,

    /// Where the persisted settings live.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Desktop shell defaults.
    #[serde(default)]
    pub desktop: DesktopConfig,
}

/// Backend API URL and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Server used until the user stores an `apiUrl` setting. Overridden by NEXUS_API_URL env.
    #[serde(default = "default_api_url")]
    pub default_url: String,

    /// Bound on the health probe, in seconds (default 3).
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,

    /// Bound on chat, model and history requests, in seconds (default 120).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Settings store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsConfig {
    /// Settings file. Relative paths are resolved against the config file's parent.
    /// Omit to use `settings.json` next to the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Desktop shell config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopConfig {
    /// Streamlit dashboard offered by the `streamlit` interface mode.
    #[serde(default = "default_streamlit_url")]
    pub streamlit_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_health_timeout_secs() -> u64 {
    3
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_streamlit_url() -> String {
    DEFAULT_STREAMLIT_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_url: default_api_url(),
            health_timeout_secs: default_health_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            streamlit_url: default_streamlit_url(),
        }
    }
}

impl ApiConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Normalize a server URL: trim whitespace and trailing slashes.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Resolve the fallback server URL: env NEXUS_API_URL overrides config.
pub fn resolve_default_api_url(config: &Config) -> String {
    std::env::var("NEXUS_API_URL")
        .ok()
        .map(|s| normalize_url(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| normalize_url(&config.api.default_url))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("NEXUS_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".nexus").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Resolve the settings file: `settings.path` if set (relative paths resolved against the
/// config file's parent), otherwise `settings.json` next to the config file.
pub fn resolve_settings_path(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.settings.path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                config_parent.join(p)
            }
        }
        _ => config_parent.join("settings.json"),
    }
}

/// Load config from the given path (or the default / NEXUS_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the settings file).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_conventions() {
        let config = Config::default();
        assert_eq!(config.api.default_url, "http://localhost:8000");
        assert_eq!(config.api.health_timeout(), Duration::from_secs(3));
        assert_eq!(config.desktop.streamlit_url, "http://localhost:8501");
    }

    #[test]
    fn empty_object_parses_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.api.request_timeout_secs, 120);
        assert!(config.settings.path.is_none());
    }

    #[test]
    fn camel_case_keys_are_read() {
        let config: Config = serde_json::from_str(
            r#"{"api":{"defaultUrl":"http://10.0.0.2:8000/","healthTimeoutSecs":5}}"#,
        )
        .unwrap();
        assert_eq!(config.api.health_timeout_secs, 5);
        assert_eq!(normalize_url(&config.api.default_url), "http://10.0.0.2:8000");
    }

    #[test]
    fn resolve_settings_path_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.nexus/config.json");
        assert_eq!(
            resolve_settings_path(&config, path),
            PathBuf::from("/home/user/.nexus/settings.json")
        );
    }

    #[test]
    fn resolve_settings_path_override_relative() {
        let mut config = Config::default();
        config.settings.path = Some(PathBuf::from("state/settings.json"));
        let path = Path::new("/home/user/.nexus/config.json");
        assert_eq!(
            resolve_settings_path(&config, path),
            PathBuf::from("/home/user/.nexus/state/settings.json")
        );
    }

    #[test]
    fn resolve_settings_path_override_absolute() {
        let mut config = Config::default();
        config.settings.path = Some(PathBuf::from("/var/lib/nexus/settings.json"));
        let path = Path::new("/home/user/.nexus/config.json");
        assert_eq!(
            resolve_settings_path(&config, path),
            PathBuf::from("/var/lib/nexus/settings.json")
        );
    }

    #[test]
    fn normalize_url_trims_slashes_and_space() {
        assert_eq!(normalize_url("  http://x:9000//  "), "http://x:9000");
    }
}
