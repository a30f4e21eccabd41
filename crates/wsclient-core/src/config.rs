use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:1337";
pub const DEFAULT_WS_URL: &str = "ws://localhost:1338";

pub const API_URL_ENV: &str = "WSCLIENT_API_URL";
pub const WS_URL_ENV: &str = "WSCLIENT_WS_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the session API (login, logout, subscribe, wsTicket)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// URL of the message relay socket
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Write the config. An existing file that does not parse is left alone.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        Self::load_from(path).map_err(|e| anyhow!("Refusing to overwrite config: {}", e))?;

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in practice.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.is_empty()) {
            self.ws_url = url;
        }
        self
    }

    /// Apply command-line overrides, which win over everything else.
    pub fn apply_overrides(mut self, api_url: Option<String>, ws_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if let Some(url) = ws_url {
            self.ws_url = url;
        }
        self
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("wsclient").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_url":"http://chat.example:8080"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url, "http://chat.example:8080");
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wsclient").join("config.json");
        let config = Config::new().apply_overrides(None, Some("ws://relay:9000".into()));
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_keeps_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"api_url\": ").unwrap();

        assert!(Config::new().save_to(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ \"api_url\": ");
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = Config {
            api_url: "http://file:1".into(),
            ws_url: "ws://file:2".into(),
        };
        let env = |key: &str| match key {
            API_URL_ENV => Some("http://env:1".to_string()),
            WS_URL_ENV => Some("ws://env:2".to_string()),
            _ => None,
        };

        let config = file
            .apply_env(env)
            .apply_overrides(Some("http://cli:1".into()), None);
        assert_eq!(config.api_url, "http://cli:1");
        assert_eq!(config.ws_url, "ws://env:2");
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let config = Config::new().apply_env(|_| Some(String::new()));
        assert_eq!(config, Config::new());
    }
}
