//! Cache storage engines
//!
//! A storage engine holds any number of named cache generations. The
//! controller only opens, reads, writes, lists and deletes them; it never
//! reaches into an engine's internals.
//!
//! | Engine | Durability | Use |
//! |--------|------------|-----|
//! | [`MemoryStorage`] | process lifetime | tests, embedding |
//! | [`FsStorage`] | on disk | the CLI host |

pub mod entry;
mod fs;
mod memory;

pub use entry::{digest_hex, validate_generation_name, GenerationInfo, StoredResponse};
pub use fs::FsStorage;
pub use memory::MemoryStorage;

use crate::config::schema::{StorageBackend, StorageConfig};
use crate::config::ConfigManager;
use crate::error::CachegateResult;
use crate::fetch::{RequestKey, Response};
use async_trait::async_trait;
use std::sync::Arc;

/// One named generation of cached responses
#[async_trait]
pub trait Generation: Send + Sync {
    /// Generation name
    fn name(&self) -> &str;

    /// Stored response for `key`, as a fresh unread response
    async fn lookup(&self, key: &RequestKey) -> CachegateResult<Option<Response>>;

    /// Store a response under `key`, replacing any previous entry.
    ///
    /// Each put is atomic per key: readers see the old entry or the new one.
    async fn put(&self, key: RequestKey, response: Response) -> CachegateResult<()>;

    /// All stored keys, sorted
    async fn keys(&self) -> CachegateResult<Vec<RequestKey>>;
}

/// Durable key-value cache storage holding named generations
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if absent
    async fn open(&self, name: &str) -> CachegateResult<Arc<dyn Generation>>;

    /// Open a generation only if it exists. Never creates one.
    async fn open_existing(&self, name: &str) -> CachegateResult<Option<Arc<dyn Generation>>>;

    /// Check whether a generation exists
    async fn has(&self, name: &str) -> CachegateResult<bool>;

    /// Names of all generations in creation order
    async fn names(&self) -> CachegateResult<Vec<String>>;

    /// Delete a generation. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> CachegateResult<bool>;

    /// Look `key` up across every generation in creation order.
    ///
    /// Never creates a generation.
    async fn match_any(&self, key: &RequestKey) -> CachegateResult<Option<Response>>;

    /// Summary of a generation, `None` if absent
    async fn info(&self, name: &str) -> CachegateResult<Option<GenerationInfo>>;

    /// Human-readable engine name for display
    fn storage_name(&self) -> &'static str;
}

/// Create the storage engine selected by configuration
pub fn create_storage(config: &StorageConfig) -> Arc<dyn CacheStorage> {
    match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Fs => {
            let root = config
                .path
                .clone()
                .unwrap_or_else(ConfigManager::generations_dir);
            Arc::new(FsStorage::new(root))
        }
    }
}
