//! Controller registration and request dispatch
//!
//! The host owns at most one active and one waiting controller. Registering
//! runs install; a successful install that asks to skip waiting is
//! activated and promoted straight away, otherwise it parks as waiting
//! until [`Host::activate_waiting`].

use crate::cache::CacheIdentity;
use crate::controller::{Controller, RetireReport};
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{Request, Response, Transport};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Where a registered controller ended up
#[derive(Debug)]
pub enum Registration {
    /// Installed, activated and serving
    Active {
        identity: CacheIdentity,
        retired: RetireReport,
    },
    /// Installed, waiting for the current controller to be released
    Waiting { identity: CacheIdentity },
}

impl Registration {
    pub fn identity(&self) -> &CacheIdentity {
        match self {
            Self::Active { identity, .. } | Self::Waiting { identity } => identity,
        }
    }
}

/// Registration host for controller generations
pub struct Host {
    transport: Arc<dyn Transport>,
    active: Mutex<Option<Arc<Controller>>>,
    waiting: Mutex<Option<Arc<Controller>>>,
    /// Identity of the most recent registration
    latest: Mutex<Option<CacheIdentity>>,
    registrations: AtomicU64,
    clients_claimed: AtomicBool,
}

impl Host {
    /// Create a host with no controller. Requests pass straight to
    /// `transport` until one is active.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            active: Mutex::new(None),
            waiting: Mutex::new(None),
            latest: Mutex::new(None),
            registrations: AtomicU64::new(0),
            clients_claimed: AtomicBool::new(false),
        }
    }

    /// Install `controller` and, if it asks to skip waiting, activate it.
    ///
    /// A failed install leaves the current controller in place. A
    /// registration overtaken by a newer one before its install completes
    /// is rejected with [`CachegateError::Superseded`].
    pub async fn register(&self, controller: Controller) -> CachegateResult<Registration> {
        let ticket = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.latest) = Some(controller.identity().clone());
        let controller = Arc::new(controller);
        info!(controller = %controller.id(), ticket, "Registering {}", controller.identity());

        let outcome = controller.on_install().await?;

        if self.registrations.load(Ordering::SeqCst) != ticket {
            warn!("Registration of {} superseded during install", controller.identity());
            let keep = self.protected(controller.identity());
            controller.abandon(keep.as_ref()).await;
            return Err(CachegateError::Superseded);
        }

        if !outcome.skip_waiting && self.active_identity().is_some() {
            let identity = controller.identity().clone();
            let previous = lock(&self.waiting).replace(Arc::clone(&controller));
            if let Some(previous) = previous {
                debug!("Replacing waiting controller {}", previous.identity());
                previous.abandon(Some(&identity)).await;
            }
            info!("{} installed and waiting", identity);
            return Ok(Registration::Waiting { identity });
        }

        self.promote(controller).await
    }

    /// Activate the waiting controller, if any
    pub async fn activate_waiting(&self) -> CachegateResult<Option<Registration>> {
        let waiting = lock(&self.waiting).take();
        match waiting {
            Some(controller) => self.promote(controller).await.map(Some),
            None => Ok(None),
        }
    }

    async fn promote(&self, controller: Arc<Controller>) -> CachegateResult<Registration> {
        let outcome = controller.on_activate().await?;
        let identity = controller.identity().clone();

        let previous = lock(&self.active).replace(Arc::clone(&controller));
        if let Some(previous) = previous {
            debug!("Releasing controller {}", previous.identity());
            previous.abandon(Some(&identity)).await;
        }

        if outcome.claim_clients {
            self.clients_claimed.store(true, Ordering::SeqCst);
        }
        info!("{} is now active", identity);

        Ok(Registration::Active {
            identity,
            retired: outcome.retired,
        })
    }

    /// Route a request through the active controller, or straight to the
    /// network when there is none
    pub async fn fetch(&self, request: Request) -> CachegateResult<Response> {
        match self.active() {
            Some(controller) => controller.on_fetch(request).await,
            None => {
                debug!("No active controller, passing {} through", request.url());
                self.transport.fetch(request).await
            }
        }
    }

    pub fn active(&self) -> Option<Arc<Controller>> {
        lock(&self.active).clone()
    }

    pub fn active_identity(&self) -> Option<CacheIdentity> {
        lock(&self.active).as_ref().map(|c| c.identity().clone())
    }

    pub fn waiting_identity(&self) -> Option<CacheIdentity> {
        lock(&self.waiting).as_ref().map(|c| c.identity().clone())
    }

    /// Whether an activated controller has taken over open clients
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Wait for the active controller's write-behind stores
    pub async fn settle(&self) {
        if let Some(controller) = self.active() {
            controller.settle().await;
        }
    }

    /// Identity shared with the active or latest registration, whose
    /// generation must survive `identity` being abandoned
    fn protected(&self, identity: &CacheIdentity) -> Option<CacheIdentity> {
        let latest = lock(&self.latest).clone();
        [self.active_identity(), latest]
            .into_iter()
            .flatten()
            .find(|other| other == identity)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
