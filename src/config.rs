use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

use crate::database::ConflictPolicy;
use crate::loader::CommitScope;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://sparkify.db?mode=rwc";
pub const DEFAULT_SONG_DATA: &str = "data/song_data";
pub const DEFAULT_LOG_DATA: &str = "data/log_data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    database_url: String,
    song_data: String,
    log_data: String,
    pub conflict_policy: ConflictPolicy,
    pub commit_scope: CommitScope,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            song_data: DEFAULT_SONG_DATA.to_string(),
            log_data: DEFAULT_LOG_DATA.to_string(),
            conflict_policy: ConflictPolicy::default(),
            commit_scope: CommitScope::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("sparkify-etl").join("config.toml"))
    }

    /// Load the default config file, or built-in defaults if there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn set_database_url(&mut self, url: String) {
        self.database_url = url;
    }

    /// Get expanded song metadata root
    pub fn song_data_path(&self) -> PathBuf {
        self.expand_path(&self.song_data)
    }

    pub fn set_song_data(&mut self, path: &Path) {
        self.song_data = path.to_string_lossy().to_string();
    }

    /// Get expanded event log root
    pub fn log_data_path(&self) -> PathBuf {
        self.expand_path(&self.log_data)
    }

    pub fn set_log_data(&mut self, path: &Path) {
        self.log_data = path.to_string_lossy().to_string();
    }
}
