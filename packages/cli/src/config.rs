use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "widgetforge.config.json";

/// Widgetforge configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one `<table>.json` file per table
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout for data actions; none means wait indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    /// Page id used when a run doesn't name one
    #[serde(default = "default_page_id")]
    pub default_page_id: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_page_id() -> String {
    "home".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the data directory
    pub fn get_data_dir(&self, cwd: &str) -> PathBuf {
        let dir = Path::new(&self.data_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            PathBuf::from(cwd).join(dir)
        }
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            http_timeout_secs: None,
            default_page_id: default_page_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "dataDir": "fixtures",
            "logLevel": "debug",
            "httpTimeoutSecs": 5,
            "defaultPageId": "checkout"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.data_dir, "fixtures");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.default_page_id, "checkout");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "logLevel": "info" }"#).unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.http_timeout(), None);
        assert_eq!(config.default_page_id, "home");
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        assert_eq!(Config::load(&cwd).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "dataDir": "store" }"#).unwrap();
        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.get_data_dir(&cwd), dir.path().join("store"));
    }
}
