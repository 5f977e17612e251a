//! Cache identity: the name of the current cache generation
//!
//! An identity is fixed when a controller is built and never changes while
//! it runs. Bumping it (a new manifest, a new build) is the only way cached
//! content is ever invalidated.

use crate::cache::manifest::AssetManifest;
use crate::error::CachegateResult;
use crate::storage::validate_generation_name;
use std::borrow::Cow;
use std::fmt;

/// Identity compiled into the binary, used when no manifest is configured
pub const BUILD_IDENTITY: CacheIdentity =
    CacheIdentity::from_static(concat!("cachegate-", env!("CARGO_PKG_VERSION")));

/// Immutable, versioned generation name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheIdentity(Cow<'static, str>);

impl CacheIdentity {
    /// Identity from a compile-time constant.
    ///
    /// The name is not validated; use [`CacheIdentity::new`] for anything
    /// that is not a literal.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Identity from an arbitrary name, validated as a generation name
    pub fn new(name: impl Into<String>) -> CachegateResult<Self> {
        let name = name.into();
        validate_generation_name(&name)?;
        Ok(Self(Cow::Owned(name)))
    }

    /// `{prefix}-{version}-{hash}` for a manifest, so any change to the asset
    /// list produces a new generation
    pub fn for_manifest(prefix: &str, manifest: &AssetManifest) -> CachegateResult<Self> {
        Self::new(format!(
            "{}-{}-{}",
            prefix,
            manifest.version(),
            manifest.hash()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for CacheIdentity {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CacheIdentity {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for CacheIdentity {
    fn eq(&self, other: &String) -> bool {
        self.0 == other.as_str()
    }
}
