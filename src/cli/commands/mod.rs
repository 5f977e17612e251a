//! CLI command implementations

pub mod activate;
pub mod config;
pub mod deploy;
pub mod fetch;
pub mod generations;
pub mod identity;
pub mod install;

pub use activate::execute as activate;
pub use config::execute as config;
pub use deploy::execute as deploy;
pub use fetch::execute as fetch;
pub use generations::execute as generations;
pub use identity::execute as identity;
pub use install::execute as install;

use crate::cache::{AssetManifest, CacheIdentity, BUILD_IDENTITY};
use crate::config::{Config, ConfigManager};
use crate::controller::Controller;
use crate::error::CachegateResult;
use crate::fetch::{HttpTransport, Transport};
use crate::storage::{create_storage, CacheStorage};
use std::sync::Arc;
use tracing::debug;

/// Identity and manifest selected by the configuration.
///
/// Without a configured manifest the build identity is used with an empty
/// manifest, so the controller caches purely by write-behind.
pub(crate) async fn current_identity(
    manager: &ConfigManager,
    config: &Config,
) -> CachegateResult<(CacheIdentity, AssetManifest)> {
    match manager.manifest_path(config) {
        Some(path) => {
            debug!("Loading asset manifest from {}", path.display());
            let manifest = AssetManifest::load(&path, &config.origin.url).await?;
            let identity = CacheIdentity::for_manifest(&config.manifest.identity_prefix, &manifest)?;
            Ok((identity, manifest))
        }
        None => Ok((
            BUILD_IDENTITY,
            AssetManifest::empty(env!("CARGO_PKG_VERSION")),
        )),
    }
}

/// Everything a controller needs, built from configuration
pub(crate) struct Runtime {
    pub identity: CacheIdentity,
    pub manifest: AssetManifest,
    pub storage: Arc<dyn CacheStorage>,
    pub transport: Arc<dyn Transport>,
}

impl Runtime {
    pub async fn load(manager: &ConfigManager, config: &Config) -> CachegateResult<Self> {
        let (identity, manifest) = current_identity(manager, config).await?;
        let storage = create_storage(&config.storage);
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config.origin.url, &config.transport)?);
        debug!(
            "Using {} storage and {} transport for {}",
            storage.storage_name(),
            transport.transport_name(),
            identity
        );

        Ok(Self {
            identity,
            manifest,
            storage,
            transport,
        })
    }

    pub fn controller(self) -> Controller {
        Controller::new(self.identity, self.manifest, self.storage, self.transport)
    }
}
