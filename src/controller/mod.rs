//! Cache controller: lifecycle handlers and request interception
//!
//! A [`Controller`] is one deployable generation of the cache manager. The
//! host drives it through three handlers and awaits each before moving on:
//!
//! - [`Controller::on_install`] provisions the generation named by its
//!   identity, all or nothing.
//! - [`Controller::on_activate`] retires every other generation.
//! - [`Controller::on_fetch`] serves one intercepted request.

mod host;
mod interceptor;
mod lifecycle;
pub mod state;
mod write_behind;

pub use host::{Host, Registration};
pub use lifecycle::{ActivateOutcome, InstallOutcome, RetireReport};
pub use state::ControllerState;
pub use write_behind::WriteBehind;

use crate::cache::{AssetManifest, CacheIdentity};
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::Transport;
use crate::storage::CacheStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// One controller generation
pub struct Controller {
    id: Uuid,
    identity: CacheIdentity,
    manifest: AssetManifest,
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    state: Mutex<ControllerState>,
    skip_waiting: bool,
    claim_clients: bool,
    /// Set when provisioning created the generation (rather than reusing it)
    created_generation: AtomicBool,
    writes: WriteBehind,
}

impl Controller {
    /// Create a controller for `identity`, provisioned from `manifest`
    pub fn new(
        identity: CacheIdentity,
        manifest: AssetManifest,
        storage: Arc<dyn CacheStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            manifest,
            storage,
            transport,
            state: Mutex::new(ControllerState::Parsed),
            skip_waiting: true,
            claim_clients: true,
            created_generation: AtomicBool::new(false),
            writes: WriteBehind::new(),
        }
    }

    /// Whether a successful install asks to replace the active controller
    /// immediately (default: true)
    pub fn with_skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    /// Whether activation takes over already-open clients (default: true)
    pub fn with_claim_clients(mut self, claim: bool) -> Self {
        self.claim_clients = claim;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &CacheIdentity {
        &self.identity
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Outstanding write-behind stores
    pub fn write_behind(&self) -> &WriteBehind {
        &self.writes
    }

    /// Wait for outstanding write-behind stores
    pub async fn settle(&self) {
        self.writes.settle().await;
    }

    fn set_state(&self, next: ControllerState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(controller = %self.id, "{} -> {}", *state, next);
        *state = next;
    }

    /// Move `from` -> `to`, failing if the controller is elsewhere
    fn transition(&self, from: ControllerState, to: ControllerState) -> CachegateResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return Err(CachegateError::InvalidState {
                expected: from.as_str(),
                actual: state.as_str(),
            });
        }
        debug!(controller = %self.id, "{} -> {}", from, to);
        *state = to;
        Ok(())
    }

    /// Retire this controller. A generation it created is deleted unless
    /// `keep` names it.
    pub(crate) async fn abandon(&self, keep: Option<&CacheIdentity>) {
        self.set_state(ControllerState::Redundant);

        let owned = self.created_generation.load(Ordering::SeqCst);
        if owned && keep != Some(&self.identity) {
            lifecycle::discard(&*self.storage, &self.identity).await;
        }
    }
}
