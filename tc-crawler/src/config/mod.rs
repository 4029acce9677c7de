use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use home_dir::HomeDirExt;
use serde::de::Error;
use serde::{Deserialize, Deserializer};

use self::twitter::TwitterConfig;

pub mod twitter;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub twitter: Option<TwitterConfig>,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conf_contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&conf_contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid config file")
    }
}

/// `~/.config/tc-crawler/config.toml` or the platform equivalent
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "tc-crawler")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Default location of the processed tweet database
pub fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "tc-crawler")
        .map(|dirs| dirs.data_dir().join("collections.db"))
        .unwrap_or_else(|| PathBuf::from("collections.db"))
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let s: PathBuf = Deserialize::deserialize(deserializer)?;
    s.expand_home().map_err(D::Error::custom)
}

fn deserialize_path_option<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_path(deserializer).map(Some)
}
