//! Cache generation naming
//!
//! Each deploy provisions one generation named by a [`CacheIdentity`].
//! Identities are content-addressed over the asset manifest, so shipping a
//! different asset list always lands in a fresh generation and the old one
//! is retired on activation.
//!
//! # Generation Lifecycle
//!
//! | Phase | Trigger | Effect |
//! |-------|---------|--------|
//! | Provision | install | open + populate from manifest, all or nothing |
//! | Serve | every fetch | read-through, write-behind on miss |
//! | Retire | activate of the next deploy | deleted |

pub mod identity;
pub mod manifest;

pub use identity::{CacheIdentity, BUILD_IDENTITY};
pub use manifest::AssetManifest;
