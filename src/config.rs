//! Configuration management for the pet launcher
//!
//! Handles loading, saving, and editing the persisted settings: search
//! roots, the games catalog, menu links and logging.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use pet_launcher_core::GameEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::platform;
use crate::search::DEFAULT_POLL_INTERVAL;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub links: LinksConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Games catalog shown in the games menu
    #[serde(default)]
    pub games: Vec<GameEntry>,

    /// Path to config file (not serialized)
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directories to search; empty means the platform fallback list
    #[serde(default)]
    pub roots: Vec<String>,

    /// How often the result queue is polled, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Read `.lnk` files to find their targets
    #[serde(default = "default_true")]
    pub resolve_shortcuts: bool,
}

/// Websites offered by the main menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_chat_url")]
    pub chat_url: String,

    #[serde(default = "default_video_url")]
    pub video_url: String,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_true() -> bool {
    true
}

fn default_chat_url() -> String {
    "https://grok.com/".to_string()
}

fn default_video_url() -> String {
    "https://youtube.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Lower bound for the poll period so a bad config cannot spin the loop
const MIN_POLL_INTERVAL_MS: u64 = 10;

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            resolve_shortcuts: true,
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            video_url: default_video_url(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            links: LinksConfig::default(),
            service: ServiceConfig::default(),
            games: Vec::new(),
            config_path: Self::default_path(),
        }
    }
}

impl Config {
    /// Default location of the config file
    fn default_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("com", "pet-launcher", "pet-launcher") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback path
            PathBuf::from(".").join("pet-launcher.toml")
        }
    }

    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, or write defaults there if not exists
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let mut config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.config_path = path.to_path_buf();
            config
        } else {
            info!("Config file not found, creating default at {:?}", path);
            let config = Config {
                config_path: path.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            config
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // Ensure parent directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;

        info!("Configuration saved to {:?}", self.config_path);
        Ok(())
    }

    /// Snapshot of the directories a new search should walk
    pub fn root_set(&self) -> Vec<PathBuf> {
        if self.search.roots.is_empty() {
            platform::fallback_roots()
        } else {
            self.search.roots.iter().map(PathBuf::from).collect()
        }
    }

    /// Whether the roots come from the user rather than the fallback list
    pub fn has_custom_roots(&self) -> bool {
        !self.search.roots.is_empty()
    }

    /// Add a search root; returns false if it was already configured
    pub fn add_root(&mut self, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() || self.search.roots.iter().any(|root| root == path) {
            return false;
        }
        self.search.roots.push(path.to_string());
        true
    }

    /// Remove a search root; returns false if it was not configured
    pub fn remove_root(&mut self, path: &str) -> bool {
        let before = self.search.roots.len();
        self.search.roots.retain(|root| root != path.trim());
        self.search.roots.len() != before
    }

    /// Poll period for the result queue
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.search.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}
