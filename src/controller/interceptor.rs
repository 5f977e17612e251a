//! Read-through request interception with write-behind refill

use crate::controller::Controller;
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{Request, Response};
use tracing::{debug, warn};

impl Controller {
    /// Serve one intercepted request.
    ///
    /// A cache hit never touches the network. On a miss the request goes to
    /// the transport; an eligible response is stored by a detached task and
    /// returned without waiting for the store.
    pub async fn on_fetch(&self, request: Request) -> CachegateResult<Response> {
        let state = self.state();
        if !state.can_serve() {
            return Err(CachegateError::InvalidState {
                expected: "activated",
                actual: state.as_str(),
            });
        }

        let key = request.key();
        if key.is_cacheable() {
            match self.storage.match_any(&key).await {
                Ok(Some(hit)) => {
                    debug!("Cache hit for {}", key);
                    return Ok(hit);
                }
                Ok(None) => debug!("Cache miss for {}", key),
                Err(e) => warn!("Cache lookup for {} failed, using network: {}", key, e),
            }
        }

        let response = self.transport.fetch(request.duplicate()?).await?;

        if !key.is_cacheable() || !response.is_cacheable() {
            debug!(
                status = response.status(),
                kind = %response.kind(),
                "Not storing {}",
                key
            );
            return Ok(response);
        }

        let copy = response.duplicate()?;
        self.writes
            .spawn(self.storage.clone(), self.identity.clone(), key, copy);
        Ok(response)
    }
}
