//! Configuration management for the ACWR CLI
//!
//! Handles loading and saving configuration from ~/.acwr/config.toml

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration for the ACWR CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workflow: WorkflowSettings,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
}

fn default_server_url() -> String {
    agent_client::DEFAULT_AGENT_API_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    #[serde(default)]
    pub poll_for_completion: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_max_attempts() -> u32 {
    150
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            poll_for_completion: false,
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub markdown_rendering: bool,

    #[serde(default = "default_true")]
    pub show_status_bar: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            markdown_rendering: true,
            show_status_bar: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadsConfig {
    /// Directory artifacts are saved to; defaults to the current directory
    #[serde(default)]
    pub dir: Option<String>,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".acwr")
            .join("config.toml")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a configuration value by key path (e.g., "server.url")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "url"] => Some(self.server.url.clone()),
            ["workflow", "poll_for_completion"] => {
                Some(self.workflow.poll_for_completion.to_string())
            }
            ["workflow", "poll_interval_ms"] => Some(self.workflow.poll_interval_ms.to_string()),
            ["workflow", "poll_max_attempts"] => Some(self.workflow.poll_max_attempts.to_string()),
            ["display", "markdown_rendering"] => {
                Some(self.display.markdown_rendering.to_string())
            }
            ["display", "show_status_bar"] => Some(self.display.show_status_bar.to_string()),
            ["downloads", "dir"] => self.downloads.dir.clone(),
            _ => None,
        }
    }

    /// Set a configuration value by key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "url"] => self.server.url = value.to_string(),
            ["workflow", "poll_for_completion"] => {
                self.workflow.poll_for_completion = value.parse().unwrap_or(false)
            }
            ["workflow", "poll_interval_ms"] => {
                self.workflow.poll_interval_ms =
                    value.parse().unwrap_or_else(|_| default_poll_interval_ms())
            }
            ["workflow", "poll_max_attempts"] => {
                self.workflow.poll_max_attempts =
                    value.parse().unwrap_or_else(|_| default_poll_max_attempts())
            }
            ["display", "markdown_rendering"] => {
                self.display.markdown_rendering = value.parse().unwrap_or(true)
            }
            ["display", "show_status_bar"] => {
                self.display.show_status_bar = value.parse().unwrap_or(true)
            }
            ["downloads", "dir"] => self.downloads.dir = Some(value.to_string()),
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://localhost:8000");
        assert!(!config.workflow.poll_for_completion);
        assert_eq!(config.workflow.poll_interval_ms, 2000);
        assert_eq!(config.workflow.poll_max_attempts, 150);
        assert!(config.display.markdown_rendering);
        assert!(config.display.show_status_bar);
        assert_eq!(config.downloads.dir, None);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.server.url, "http://localhost:8000");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("server.url", "http://agent:9000").unwrap();
        config.set("workflow.poll_for_completion", "true").unwrap();
        config.set("downloads.dir", "/tmp/reports").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.server.url, "http://agent:9000");
        assert!(reloaded.workflow.poll_for_completion);
        assert_eq!(reloaded.downloads.dir, Some("/tmp/reports".to_string()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[server]\nurl = \"http://agent:9000\"\n").unwrap();
        assert_eq!(config.server.url, "http://agent:9000");
        assert_eq!(config.workflow.poll_interval_ms, 2000);
        assert!(config.display.markdown_rendering);
    }

    #[test]
    fn test_get_and_set_by_key() {
        let mut config = Config::default();

        config.set("workflow.poll_interval_ms", "500").unwrap();
        assert_eq!(
            config.get("workflow.poll_interval_ms"),
            Some("500".to_string())
        );

        assert_eq!(config.get("downloads.dir"), None);
        assert!(config.set("nonsense.key", "x").is_err());
        assert_eq!(config.get("nonsense.key"), None);
    }
}
