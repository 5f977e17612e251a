//! In-process storage engine

use crate::error::CachegateResult;
use crate::fetch::{RequestKey, Response};
use crate::storage::entry::{validate_generation_name, GenerationInfo, StoredResponse};
use crate::storage::{CacheStorage, Generation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type Entries = BTreeMap<RequestKey, (StoredResponse, Arc<[u8]>)>;

/// A generation held in memory
pub struct MemoryGeneration {
    name: String,
    created_at: DateTime<Utc>,
    entries: RwLock<Entries>,
}

impl MemoryGeneration {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    async fn get(&self, key: &RequestKey) -> Option<Response> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .map(|(meta, body)| meta.to_response(Arc::clone(body)))
    }
}

#[async_trait]
impl Generation for MemoryGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        Ok(self.get(key).await)
    }

    async fn put(&self, key: RequestKey, response: Response) -> CachegateResult<()> {
        let (meta, body) = StoredResponse::capture(key.clone(), response)?;
        self.entries.write().await.insert(key, (meta, body));
        Ok(())
    }

    async fn keys(&self) -> CachegateResult<Vec<RequestKey>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// Storage engine keeping generations in memory, in creation order
#[derive(Default)]
pub struct MemoryStorage {
    generations: RwLock<Vec<Arc<MemoryGeneration>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find(&self, name: &str) -> Option<Arc<MemoryGeneration>> {
        self.generations
            .read()
            .await
            .iter()
            .find(|g| g.name == name)
            .cloned()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> CachegateResult<Arc<dyn Generation>> {
        validate_generation_name(name)?;

        let mut generations = self.generations.write().await;
        if let Some(existing) = generations.iter().find(|g| g.name == name) {
            return Ok(existing.clone());
        }

        debug!("Creating generation {}", name);
        let generation = Arc::new(MemoryGeneration::new(name));
        generations.push(generation.clone());
        Ok(generation)
    }

    async fn open_existing(&self, name: &str) -> CachegateResult<Option<Arc<dyn Generation>>> {
        Ok(self
            .find(name)
            .await
            .map(|generation| generation as Arc<dyn Generation>))
    }

    async fn has(&self, name: &str) -> CachegateResult<bool> {
        Ok(self.find(name).await.is_some())
    }

    async fn names(&self) -> CachegateResult<Vec<String>> {
        Ok(self
            .generations
            .read()
            .await
            .iter()
            .map(|g| g.name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> CachegateResult<bool> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != name);
        Ok(generations.len() != before)
    }

    async fn match_any(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        let generations: Vec<_> = self.generations.read().await.clone();
        for generation in generations {
            if let Some(response) = generation.get(key).await {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn info(&self, name: &str) -> CachegateResult<Option<GenerationInfo>> {
        match self.find(name).await {
            Some(g) => Ok(Some(GenerationInfo {
                name: g.name.clone(),
                created_at: g.created_at,
                entries: g.entries.read().await.len(),
            })),
            None => Ok(None),
        }
    }

    fn storage_name(&self) -> &'static str {
        "memory"
    }
}
