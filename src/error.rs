//! Error types for cachegate
//!
//! All modules use `CachegateResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cachegate operations
pub type CachegateResult<T> = Result<T, CachegateError>;

/// All errors that can occur in cachegate
#[derive(Error, Debug)]
pub enum CachegateError {
    // Lifecycle errors
    #[error("Provisioning {generation} failed at {url}: {reason}")]
    Provision {
        generation: String,
        url: String,
        reason: String,
    },

    #[error("Failed to delete stale generation {name}: {reason}")]
    RetireDeletion { name: String, reason: String },

    #[error("Registration superseded by a newer controller before install completed")]
    Superseded,

    #[error("Controller is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    // Network errors
    #[error("Network unavailable for {url}: {reason}")]
    NetworkUnavailable { url: String, reason: String },

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Cache errors
    #[error("Failed to write {key} into generation {generation}: {reason}")]
    CacheWrite {
        generation: String,
        key: String,
        reason: String,
    },

    #[error("Body of {0} has already been consumed")]
    BodyUsed(String),

    #[error("Generation {0} has not been provisioned")]
    GenerationMissing(String),

    #[error("Invalid generation name: {0}")]
    InvalidGenerationName(String),

    #[error("Corrupt cache entry at {path}: {reason}")]
    CorruptEntry { path: PathBuf, reason: String },

    // Manifest errors
    #[error("Invalid asset manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Wildcard manifest entry {0:?} cannot be resolved to a resource")]
    ManifestWildcard(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CachegateError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network unavailable error
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::NetworkUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a provisioning error for one manifest entry
    pub fn provision(
        generation: impl Into<String>,
        url: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Provision {
            generation: generation.into(),
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable { .. } | Self::Provision { .. } | Self::Superseded
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Provision { .. } => {
                Some("The previous controller stays active. Fix the manifest entry and run: cachegate deploy")
            }
            Self::ManifestWildcard(_) => Some("List every asset explicitly in the manifest"),
            Self::NetworkUnavailable { .. } => {
                Some("The resource is not cached and the origin is unreachable")
            }
            Self::ConfigInvalid { .. } => Some("Run: cachegate config init --force"),
            Self::GenerationMissing(_) => Some("Run: cachegate install"),
            _ => None,
        }
    }
}
