//! Configuration schema for cachegate
//!
//! Configuration is stored at `~/.config/cachegate/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Origin the controller is scoped to
    pub origin: OriginConfig,

    /// Asset manifest settings
    pub manifest: ManifestConfig,

    /// Cache storage settings
    pub storage: StorageConfig,

    /// Network transport settings
    pub transport: TransportConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Controller origin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Absolute origin URL; same-origin responses are the only cacheable ones
    pub url: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
        }
    }
}

/// Asset manifest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest file, relative paths resolve against the config directory
    pub path: Option<PathBuf>,

    /// Prefix of every generation name
    pub identity_prefix: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: None,
            identity_prefix: "cachegate".to_string(),
        }
    }
}

/// Storage engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable generations on disk
    #[default]
    Fs,
    /// Generations live only as long as the process
    Memory,
}

/// Cache storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Engine to use
    pub backend: StorageBackend,

    /// Storage root (default: state dir)
    pub path: Option<PathBuf>,
}

/// Network transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent sent when the request has none
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("cachegate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
