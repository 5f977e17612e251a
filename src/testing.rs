//! Test doubles for the transport and storage seams

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{Headers, Request, RequestKey, Response, ResponseType, Transport};
use crate::storage::{CacheStorage, Generation, GenerationInfo, MemoryStorage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum Route {
    Respond {
        status: u16,
        kind: ResponseType,
        body: Vec<u8>,
    },
    Offline,
}

/// Transport answering from a fixed route table; unknown URLs are offline
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(self, url: &str, route: Route) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), route);
        self
    }

    /// Same-origin 200 with `body`
    pub fn ok(self, url: &str, body: &str) -> Self {
        self.respond(url, 200, ResponseType::Basic, body)
    }

    pub fn respond(self, url: &str, status: u16, kind: ResponseType, body: &str) -> Self {
        self.route(
            url,
            Route::Respond {
                status,
                kind,
                body: body.as_bytes().to_vec(),
            },
        )
    }

    pub fn offline(self, url: &str) -> Self {
        self.route(url, Route::Offline)
    }

    /// Hold responses for `url` for `delay`
    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Take a route offline after construction
    pub fn go_offline(&self, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Offline);
    }

    /// Number of fetches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: Request) -> CachegateResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (_, url, _, _) = request.into_parts()?;

        if let Some(delay) = self.delays.get(&url) {
            tokio::time::sleep(*delay).await;
        }

        let route = self.routes.lock().unwrap().get(&url).cloned();
        match route {
            Some(Route::Respond { status, kind, body }) => {
                Ok(Response::new(status, url, kind, Headers::new(), body))
            }
            Some(Route::Offline) | None => Err(CachegateError::network(url, "offline")),
        }
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

struct FlakyGeneration {
    inner: Arc<dyn Generation>,
    fail_puts: bool,
    put_delay: Option<Duration>,
}

#[async_trait]
impl Generation for FlakyGeneration {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn lookup(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        self.inner.lookup(key).await
    }

    async fn put(&self, key: RequestKey, response: Response) -> CachegateResult<()> {
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts {
            return Err(CachegateError::io(
                format!("writing {}", key),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.put(key, response).await
    }

    async fn keys(&self) -> CachegateResult<Vec<RequestKey>> {
        self.inner.keys().await
    }
}

/// Memory storage with injectable failures
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_puts: bool,
    fail_deletes: HashSet<String>,
    fail_lookups: bool,
    put_delay: Option<Duration>,
    check_delay: Option<Duration>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_deletes.insert(name.to_string());
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Hold every put for `delay` before storing
    pub fn delayed_puts(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    /// Hold existence checks for `delay` after answering them
    pub fn delayed_checks(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    fn wrap(&self, inner: Arc<dyn Generation>) -> Arc<dyn Generation> {
        Arc::new(FlakyGeneration {
            inner,
            fail_puts: self.fail_puts,
            put_delay: self.put_delay,
        })
    }

    async fn hold_check(&self) {
        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> CachegateResult<Arc<dyn Generation>> {
        let inner = self.inner.open(name).await?;
        Ok(self.wrap(inner))
    }

    async fn open_existing(&self, name: &str) -> CachegateResult<Option<Arc<dyn Generation>>> {
        let inner = self.inner.open_existing(name).await?;
        self.hold_check().await;
        Ok(inner.map(|inner| self.wrap(inner)))
    }

    async fn has(&self, name: &str) -> CachegateResult<bool> {
        let exists = self.inner.has(name).await?;
        self.hold_check().await;
        Ok(exists)
    }

    async fn names(&self) -> CachegateResult<Vec<String>> {
        self.inner.names().await
    }

    async fn delete(&self, name: &str) -> CachegateResult<bool> {
        if self.fail_deletes.contains(name) {
            return Err(CachegateError::io(
                format!("deleting {}", name),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            ));
        }
        self.inner.delete(name).await
    }

    async fn match_any(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        if self.fail_lookups {
            return Err(CachegateError::Internal("lookup failed".to_string()));
        }
        self.inner.match_any(key).await
    }

    async fn info(&self, name: &str) -> CachegateResult<Option<GenerationInfo>> {
        self.inner.info(name).await
    }

    fn storage_name(&self) -> &'static str {
        "flaky"
    }
}
