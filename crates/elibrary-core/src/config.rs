//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, where the bearer token is kept, and the
//! last email used to sign in.
//!
//! Configuration is stored at `~/.config/elibrary/config.json`. The
//! `ELIBRARY_BASE_URL` and `ELIBRARY_TOKEN_STORAGE` environment variables
//! override the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::auth::{FileTokenStore, KeyringTokenStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "elibrary";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable selecting the API origin
pub const BASE_URL_ENV: &str = "ELIBRARY_BASE_URL";

/// Environment variable selecting the token storage backend
pub const TOKEN_STORAGE_ENV: &str = "ELIBRARY_TOKEN_STORAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
}

impl TokenStorage {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "file" => Some(TokenStorage::File),
            "keyring" | "keychain" => Some(TokenStorage::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    #[serde(default)]
    pub token_storage: TokenStorage,
    pub last_email: Option<String>,
    pub log_dir: Option<PathBuf>,

    /// Environment overrides; never written back to the file
    #[serde(skip)]
    env_base_url: Option<String>,
    #[serde(skip)]
    env_token_storage: Option<TokenStorage>,
}

impl Config {
    /// Load the config file and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env_base_url = var(BASE_URL_ENV).filter(|u| !u.trim().is_empty());
        self.env_token_storage = var(TOKEN_STORAGE_ENV).as_deref().and_then(TokenStorage::parse);
    }

    /// Storage backend in effect, after environment overrides
    pub fn token_storage(&self) -> TokenStorage {
        self.env_token_storage.unwrap_or(self.token_storage)
    }

    /// API origin with any trailing slash removed
    pub fn base_url(&self) -> String {
        self.env_base_url
            .as_deref()
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Token storage backend selected by this config
    pub fn token_store(&self) -> Result<Box<dyn TokenStore>> {
        Ok(match self.token_storage() {
            TokenStorage::File => Box::new(FileTokenStore::new(self.cache_dir()?)),
            TokenStorage::Keyring => Box::new(KeyringTokenStore::new()),
        })
    }
}
