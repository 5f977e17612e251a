//! Asset manifest: the resources a generation must hold after provisioning
//!
//! Manifests are explicit lists. Glob entries such as `/*` cannot be
//! resolved by a storage engine and are rejected at load time.
//!
//! ```toml
//! version = "42"
//! assets = ["/", "/index.html", "/app.wasm", "/app.js"]
//! ```

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::resolve_url;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// On-disk manifest format
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    version: String,
    #[serde(default)]
    assets: Vec<String>,
}

/// Ordered, de-duplicated list of absolute asset URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    version: String,
    entries: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest, resolving every entry against `origin`
    pub fn new<I, S>(version: impl Into<String>, origin: &str, assets: I) -> CachegateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for asset in assets {
            let asset = asset.as_ref();
            if asset.contains('*') {
                return Err(CachegateError::ManifestWildcard(asset.to_string()));
            }

            let url = resolve_url(origin, asset)?;
            if seen.insert(url.clone()) {
                entries.push(url);
            }
        }

        Ok(Self {
            version: version.into(),
            entries,
        })
    }

    /// Empty manifest: provisioning only creates the generation
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            entries: vec![],
        }
    }

    /// Load a TOML manifest file
    pub async fn load(path: &Path, origin: &str) -> CachegateResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            CachegateError::io(format!("reading manifest {}", path.display()), e)
        })?;

        let file: ManifestFile =
            toml::from_str(&content).map_err(|e| CachegateError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let manifest = Self::new(file.version, origin, &file.assets)?;
        debug!(
            "Loaded manifest {} with {} assets",
            path.display(),
            manifest.len()
        );
        Ok(manifest)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Absolute asset URLs in manifest order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA256 over version and entries, first 12 hex chars
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        for entry in &self.entries {
            hasher.update(b"\n");
            hasher.update(entry.as_bytes());
        }
        let result = hasher.finalize();

        // Take first 12 hex characters (6 bytes)
        hex::encode(&result[..6])
    }
}
