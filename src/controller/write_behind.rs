//! Detached cache population
//!
//! Write-behind stores run as spawned tasks off the response path. Nothing
//! they do (success, failure, or being dropped at shutdown) reaches the
//! caller that received the response. The tracker only counts them so a
//! host can wait for quiescence before exiting.

use crate::cache::CacheIdentity;
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{RequestKey, Response};
use crate::storage::CacheStorage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    pending: AtomicUsize,
    failures: AtomicUsize,
    idle: Notify,
}

/// Store into an existing generation. Returns false if it is gone,
/// including when it is deleted between the lookup and the put.
async fn store(
    storage: &dyn CacheStorage,
    generation: &CacheIdentity,
    key: RequestKey,
    response: Response,
) -> CachegateResult<bool> {
    let Some(target) = storage.open_existing(generation.as_str()).await? else {
        return Ok(false);
    };
    match target.put(key, response).await {
        Ok(()) => Ok(true),
        Err(CachegateError::GenerationMissing(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Tracker for outstanding write-behind tasks
#[derive(Clone, Default)]
pub struct WriteBehind {
    inner: Arc<Inner>,
}

impl WriteBehind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a detached store of `response` under `key`.
    ///
    /// Skipped when the generation no longer exists (retired by a newer
    /// deploy) so a stale controller never resurrects it.
    pub fn spawn(
        &self,
        storage: Arc<dyn CacheStorage>,
        generation: CacheIdentity,
        key: RequestKey,
        response: Response,
    ) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            match store(&*storage, &generation, key.clone(), response).await {
                Ok(true) => debug!("Write-behind stored {} in {}", key, generation),
                Ok(false) => {
                    debug!("Generation {} retired, dropped write of {}", generation, key)
                }
                Err(e) => {
                    inner.failures.fetch_add(1, Ordering::SeqCst);
                    let err = CachegateError::CacheWrite {
                        generation: generation.to_string(),
                        key: key.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                }
            }

            if inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    /// Writes spawned but not finished
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Writes that failed since creation
    pub fn failures(&self) -> usize {
        self.inner.failures.load(Ordering::SeqCst)
    }

    /// Wait until no write is pending
    pub async fn settle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}
