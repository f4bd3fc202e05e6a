use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub server_url: Option<String>,
    pub download_dir: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_url: None,
            download_dir: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Where batch artifacts land: configured dir, the user's download
    /// directory, or the working directory as a last resort.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("economia"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.json"))
    }
}
