//! Install and activate handlers
//!
//! Install populates the controller's generation from the asset manifest
//! and fails as a whole if any asset cannot be fetched or stored. Activate
//! deletes every other generation, isolating per-generation failures.

use crate::cache::{AssetManifest, CacheIdentity};
use crate::controller::{Controller, ControllerState};
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{Request, RequestKey, Response, Transport};
use crate::storage::{CacheStorage, Generation};
use futures_util::future::{join_all, try_join_all};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// Result of a successful install
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Generation that was provisioned
    pub generation: CacheIdentity,
    /// Manifest entries stored
    pub assets: usize,
    /// Replace the active controller without waiting for its clients
    pub skip_waiting: bool,
}

/// What retirement did
#[derive(Debug, Default)]
pub struct RetireReport {
    /// Stale generations removed
    pub deleted: Vec<String>,
    /// Deletions that failed; each is a `RetireDeletion` error
    pub failures: Vec<CachegateError>,
}

impl RetireReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of activation
#[derive(Debug)]
pub struct ActivateOutcome {
    pub retired: RetireReport,
    /// Take over already-open clients now
    pub claim_clients: bool,
}

impl Controller {
    /// Provision this controller's generation.
    ///
    /// On failure the controller becomes redundant and must not be
    /// activated; the caller keeps the previous controller in place.
    pub async fn on_install(&self) -> CachegateResult<InstallOutcome> {
        self.transition(ControllerState::Parsed, ControllerState::Installing)?;
        info!(controller = %self.id, "Provisioning {}", self.identity);

        match self.provision().await {
            Ok(assets) => {
                self.set_state(ControllerState::Installed);
                info!("Provisioned {} with {} assets", self.identity, assets);
                Ok(InstallOutcome {
                    generation: self.identity.clone(),
                    assets,
                    skip_waiting: self.skip_waiting,
                })
            }
            Err(e) => {
                warn!("Provisioning {} failed: {}", self.identity, e);
                self.abandon(None).await;
                Err(e)
            }
        }
    }

    /// Delete every generation other than this controller's.
    ///
    /// Only failing to enumerate generations is an error; a failed deletion
    /// is logged, recorded in the report and does not stop the others.
    pub async fn on_activate(&self) -> CachegateResult<ActivateOutcome> {
        self.transition(ControllerState::Installed, ControllerState::Activating)?;

        let retired = match retire(&*self.storage, &self.identity).await {
            Ok(report) => report,
            Err(e) => {
                self.set_state(ControllerState::Installed);
                return Err(e);
            }
        };

        self.set_state(ControllerState::Activated);
        info!(
            "Activated {} (retired {}, {} failed)",
            self.identity,
            retired.deleted.len(),
            retired.failures.len()
        );

        Ok(ActivateOutcome {
            retired,
            claim_clients: self.claim_clients,
        })
    }

    /// Take over a generation provisioned by an earlier run so it can be
    /// activated without installing again
    pub async fn adopt(&self) -> CachegateResult<()> {
        if !self.storage.has(self.identity.as_str()).await? {
            return Err(CachegateError::GenerationMissing(self.identity.to_string()));
        }
        self.transition(ControllerState::Parsed, ControllerState::Installed)
    }

    async fn provision(&self) -> CachegateResult<usize> {
        let name = self.identity.as_str();
        let existed = self.storage.has(name).await?;
        let generation = self.storage.open(name).await?;
        if !existed {
            self.created_generation.store(true, Ordering::SeqCst);
        }

        let result = populate(
            &*generation,
            &self.identity,
            &self.manifest,
            &*self.transport,
        )
        .await;

        if result.is_err() && !existed {
            discard(&*self.storage, &self.identity).await;
            self.created_generation.store(false, Ordering::SeqCst);
        }
        result
    }
}

/// Fetch every manifest entry, then store them all.
///
/// Nothing is written unless every fetch produced a 2xx response.
async fn populate(
    generation: &dyn Generation,
    identity: &CacheIdentity,
    manifest: &AssetManifest,
    transport: &dyn Transport,
) -> CachegateResult<usize> {
    let fetches = manifest.entries().iter().map(|url| async move {
        let response = transport
            .fetch(Request::get(url.as_str()))
            .await
            .map_err(|e| CachegateError::provision(identity.as_str(), url, e))?;

        if !response.is_ok() {
            return Err(CachegateError::provision(
                identity.as_str(),
                url,
                format!("status {}", response.status()),
            ));
        }
        Ok::<(RequestKey, Response), CachegateError>((RequestKey::get(url), response))
    });

    let responses = try_join_all(fetches).await?;

    let count = responses.len();
    for (key, response) in responses {
        let url = key.url.clone();
        generation
            .put(key, response)
            .await
            .map_err(|e| CachegateError::provision(identity.as_str(), url, e))?;
    }
    Ok(count)
}

/// Delete all generations except `keep`, concurrently and independently
async fn retire(storage: &dyn CacheStorage, keep: &CacheIdentity) -> CachegateResult<RetireReport> {
    let stale: Vec<String> = storage
        .names()
        .await?
        .into_iter()
        .filter(|name| keep != name)
        .collect();

    if stale.is_empty() {
        debug!("No stale generations besides {}", keep);
        return Ok(RetireReport::default());
    }

    let results = join_all(stale.iter().map(|name| async move {
        (name.clone(), storage.delete(name).await)
    }))
    .await;

    let mut report = RetireReport::default();
    for (name, result) in results {
        match result {
            Ok(true) => {
                info!("Retired generation {}", name);
                report.deleted.push(name);
            }
            Ok(false) => debug!("Generation {} already gone", name),
            Err(e) => {
                let err = CachegateError::RetireDeletion {
                    name,
                    reason: e.to_string(),
                };
                warn!("{}", err);
                report.failures.push(err);
            }
        }
    }
    Ok(report)
}

/// Best-effort removal of a generation this controller created
pub(crate) async fn discard(storage: &dyn CacheStorage, identity: &CacheIdentity) {
    match storage.delete(identity.as_str()).await {
        Ok(_) => debug!("Discarded generation {}", identity),
        Err(e) => warn!("Failed to discard generation {}: {}", identity, e),
    }
}
