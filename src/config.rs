// src/config.rs - Farm configuration
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure for the farm host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub farm: FarmConfig,

    #[serde(default)]
    pub web: WebConfig,
}

/// Printer pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FarmConfig {
    /// Ordered printer base URLs. Order defines poll and selection priority.
    #[serde(default)]
    pub printers: Vec<String>,

    /// Bound on each status poll, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Bound on an upload transfer, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

/// Web interface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_poll_timeout() -> u64 { 5 }
fn default_upload_timeout() -> u64 { 120 }
fn default_bind_address() -> String { "0.0.0.0".to_string() }
fn default_web_port() -> u16 { 5000 }

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            printers: Vec::new(),
            poll_timeout_secs: default_poll_timeout(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_web_port(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error: the farm can be configured entirely
    /// through the `PRINTER_URLS` environment variable.
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let mut config = if Path::new(config_path).exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            tracing::info!("Loaded configuration from: {}", config_path);
            config
        } else {
            tracing::info!("No config file at '{}', using defaults", config_path);
            Config::default()
        };

        config.apply_env_overrides(std::env::var("PRINTER_URLS").ok().as_deref());
        Ok(config)
    }

    /// Override the printer list from a comma-separated URL list.
    ///
    /// Empty entries are kept; they fail every poll and surface as
    /// unreachable in diagnostics.
    fn apply_env_overrides(&mut self, printer_urls: Option<&str>) {
        if let Some(urls) = printer_urls {
            self.farm.printers = urls.split(',').map(|url| url.to_string()).collect();
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.web.bind_address, self.web.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.farm.printers.is_empty());
        assert_eq!(config.farm.poll_timeout_secs, 5);
        assert_eq!(config.farm.upload_timeout_secs, 120);
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert_eq!(config.web.port, 5000);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_config = r#"
[farm]
printers = ["http://ender.local", "http://prusa.local"]
poll_timeout_secs = 3

[web]
bind_address = "127.0.0.1"
port = 8080
        "#;

        let config: Config = toml::from_str(toml_config).unwrap();

        assert_eq!(
            config.farm.printers,
            vec!["http://ender.local", "http://prusa.local"]
        );
        assert_eq!(config.farm.poll_timeout_secs, 3);
        // Unset fields keep their defaults
        assert_eq!(config.farm.upload_timeout_secs, 120);
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_env_override_replaces_printer_list() {
        let mut config = Config::default();
        config.farm.printers = vec!["http://old.local".to_string()];

        config.apply_env_overrides(Some("http://a.local,http://b.local"));

        assert_eq!(config.farm.printers, vec!["http://a.local", "http://b.local"]);
    }

    #[test]
    fn test_env_override_keeps_empty_entries() {
        let mut config = Config::default();
        config.apply_env_overrides(Some("http://a.local,,http://b.local,"));

        assert_eq!(
            config.farm.printers,
            vec!["http://a.local", "", "http://b.local", ""]
        );
    }

    #[test]
    fn test_no_env_override_keeps_file_list() {
        let mut config = Config::default();
        config.farm.printers = vec!["http://file.local".to_string()];

        config.apply_env_overrides(None);

        assert_eq!(config.farm.printers, vec!["http://file.local"]);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.web.port, 5000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm.toml");
        std::fs::write(&path, "[farm]\nprinters = [\"http://ender.local\"]\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.farm.printers, vec!["http://ender.local"]);
    }
}
