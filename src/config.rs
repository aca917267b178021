//! Connection settings: command-line flags and environment first, then the
//! TOML config file, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://code.fineres.com";

pub const KEYS: &[&str] = &["base_url", "token"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// The config file on disk. A missing file reads as empty.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    config: FileConfig,
}

impl ConfigFile {
    pub fn open(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            FileConfig::default()
        };
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        match key {
            "base_url" => Some(self.config.base_url.as_deref()),
            "token" => Some(self.config.token.as_deref()),
            _ => None,
        }
    }

    /// Returns false for an unknown key. An empty value or `none` clears the key.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let value = match value {
            "" | "none" => None,
            v => Some(v.to_string()),
        };
        match key {
            "base_url" => self.config.base_url = value,
            "token" => self.config.token = value,
            _ => return false,
        }
        true
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::DirCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(&self.config)?;
        fs::write(&self.path, content).map_err(|source| ConfigError::FileWrite {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join("bitbucket-mcp").join("config.toml"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Resolved connection settings for the backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub token: String,
}

impl Settings {
    pub fn resolve(
        base_url: Option<String>,
        token: Option<String>,
        file: &ConfigFile,
    ) -> Result<Self, ConfigError> {
        let base_url = present(base_url)
            .or_else(|| present(file.config.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token = present(token)
            .or_else(|| present(file.config.token.clone()))
            .ok_or_else(|| ConfigError::MissingToken(file.path.display().to_string()))?;
        Ok(Self { base_url, token })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Hide all but the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}
