use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_ASSET_BASE_URL: &str = "https://assets.vvebo.vip/scripts/datas";
pub const DEFAULT_DANMU_SERVER: &str = "https://api.dandanplay.net";
pub const DANMU_USER_AGENT: &str = "ForwardWidgets/1.0.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub danmu: DanmuConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_asset_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DanmuConfig {
    #[serde(default = "default_danmu_server")]
    pub server: String,
    #[serde(default = "default_danmu_user_agent")]
    pub user_agent: String,
    /// Segment payloads are served zlib-compressed
    #[serde(default)]
    pub zlib_segments: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `storage.json` in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_asset_base_url() -> String {
    DEFAULT_ASSET_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("widgetfeed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_items() -> usize {
    50
}

fn default_danmu_server() -> String {
    DEFAULT_DANMU_SERVER.to_string()
}

fn default_danmu_user_agent() -> String {
    DANMU_USER_AGENT.to_string()
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_asset_base_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}

impl Default for DanmuConfig {
    fn default() -> Self {
        Self {
            server: default_danmu_server(),
            user_agent: default_danmu_user_agent(),
            zlib_segments: false,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "widgetfeed").ok_or(Error::NoConfigDir)
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load from `path`, writing the defaults there first if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("storage.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.assets.base_url, DEFAULT_ASSET_BASE_URL);
        assert_eq!(config.schedule.max_items, 50);
        assert_eq!(config.danmu.user_agent, DANMU_USER_AGENT);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule]\nmax_items = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.schedule.max_items, 10);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.danmu.server, DEFAULT_DANMU_SERVER);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_explicit_storage_path_wins() {
        let mut config = Config::default();
        config.storage.path = Some(PathBuf::from("/tmp/memo.json"));
        assert_eq!(
            config.storage_path().unwrap(),
            PathBuf::from("/tmp/memo.json")
        );
    }
}
