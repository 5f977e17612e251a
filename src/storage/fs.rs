//! On-disk storage engine
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<generation>/generation.json      marker: name, created_at
//! <root>/<generation>/entries/<sha256(key)>.json   StoredResponse
//! <root>/<generation>/bodies/<sha256(body)>        body bytes
//! ```
//!
//! Bodies are content-addressed and written before the entry that points at
//! them. Every file lands via write-to-temp + rename, so a reader sees either
//! the previous entry or the complete new one.

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{RequestKey, Response};
use crate::storage::entry::{digest_hex, validate_generation_name, GenerationInfo, StoredResponse};
use crate::storage::{CacheStorage, Generation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const MARKER_FILE: &str = "generation.json";
const ENTRIES_DIR: &str = "entries";
const BODIES_DIR: &str = "bodies";

/// Generation marker file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationMarker {
    name: String,
    created_at: DateTime<Utc>,
}

/// Write a file so it appears atomically at `path`
async fn write_atomic(path: &Path, contents: &[u8]) -> CachegateResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp-{}", file_name, Uuid::new_v4()));

    fs::write(&tmp, contents)
        .await
        .map_err(|e| CachegateError::io(format!("writing {}", tmp.display()), e))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(CachegateError::io(
            format!("renaming into {}", path.display()),
            e,
        ));
    }
    Ok(())
}

/// Read a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> CachegateResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CachegateError::io(format!("reading {}", path.display()), e)),
    }
}

/// A generation directory
pub struct FsGeneration {
    name: String,
    dir: PathBuf,
}

impl FsGeneration {
    fn at(root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: root.join(name),
        }
    }

    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        self.dir
            .join(ENTRIES_DIR)
            .join(format!("{}.json", digest_hex(key.to_string().as_bytes())))
    }

    fn body_path(&self, digest: &str) -> PathBuf {
        self.dir.join(BODIES_DIR).join(digest)
    }

    async fn read_entry(&self, path: &Path) -> CachegateResult<Option<StoredResponse>> {
        let Some(bytes) = read_optional(path).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CachegateError::CorruptEntry {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn entry_count(&self) -> CachegateResult<usize> {
        Ok(self.entry_files().await?.len())
    }

    async fn entry_files(&self) -> CachegateResult<Vec<PathBuf>> {
        let dir = self.dir.join(ENTRIES_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(CachegateError::io(format!("reading {}", dir.display()), e)),
        };

        let mut files = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CachegateError::io("reading cache entry", e))?
        {
            let path = entry.path();
            let is_entry = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if is_entry {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl Generation for FsGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        let Some(meta) = self.read_entry(&self.entry_path(key)).await? else {
            return Ok(None);
        };

        if meta.key != *key {
            warn!("Entry key mismatch in {}: {} != {}", self.name, meta.key, key);
            return Ok(None);
        }

        let body_path = self.body_path(&meta.body_digest);
        match read_optional(&body_path).await? {
            Some(body) => Ok(Some(meta.to_response(body.into()))),
            None => Err(CachegateError::CorruptEntry {
                path: body_path,
                reason: "body missing".to_string(),
            }),
        }
    }

    async fn put(&self, key: RequestKey, response: Response) -> CachegateResult<()> {
        let (meta, body) = StoredResponse::capture(key.clone(), response)?;

        // Only the subdirectories are created here; a put into a deleted
        // generation must fail instead of recreating its directory.
        for sub in [ENTRIES_DIR, BODIES_DIR] {
            let dir = self.dir.join(sub);
            match fs::create_dir(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(CachegateError::GenerationMissing(self.name.clone()))
                }
                Err(e) => {
                    return Err(CachegateError::io(format!("creating {}", dir.display()), e))
                }
            }
        }

        let json = serde_json::to_vec_pretty(&meta)?;
        let body_path = self.body_path(&meta.body_digest);
        let written = async {
            if !fs::try_exists(&body_path).await.unwrap_or(false) {
                write_atomic(&body_path, &body).await?;
            }
            write_atomic(&self.entry_path(&key), &json).await
        }
        .await;
        if let Err(e) = written {
            // Deleted while writing
            if !fs::try_exists(&self.dir).await.unwrap_or(false) {
                return Err(CachegateError::GenerationMissing(self.name.clone()));
            }
            return Err(e);
        }

        debug!("Stored {} in {} ({} bytes)", key, self.name, body.len());
        Ok(())
    }

    async fn keys(&self) -> CachegateResult<Vec<RequestKey>> {
        let mut keys = vec![];
        for path in self.entry_files().await? {
            if let Some(meta) = self.read_entry(&path).await? {
                keys.push(meta.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Storage engine with one directory per generation
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create an engine rooted at `root` (created lazily)
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn marker(&self, name: &str) -> CachegateResult<Option<GenerationMarker>> {
        let path = self.root.join(name).join(MARKER_FILE);
        match read_optional(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn markers(&self) -> CachegateResult<Vec<GenerationMarker>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(CachegateError::io(
                    format!("reading storage root {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut markers = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CachegateError::io("reading storage entry", e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_generation_name(&name).is_err() {
                continue;
            }
            match self.marker(&name).await {
                Ok(Some(marker)) => markers.push(marker),
                Ok(None) => {}
                Err(e) => warn!("Skipping generation {}: {}", name, e),
            }
        }

        markers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(markers)
    }
}

#[async_trait]
impl CacheStorage for FsStorage {
    async fn open(&self, name: &str) -> CachegateResult<Arc<dyn Generation>> {
        validate_generation_name(name)?;

        let generation = FsGeneration::at(&self.root, name);
        if self.marker(name).await?.is_none() {
            fs::create_dir_all(&generation.dir).await.map_err(|e| {
                CachegateError::io(format!("creating {}", generation.dir.display()), e)
            })?;

            let marker = GenerationMarker {
                name: name.to_string(),
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec_pretty(&marker)?;
            write_atomic(&generation.dir.join(MARKER_FILE), &json).await?;
            debug!("Created generation {} at {}", name, generation.dir.display());
        }

        Ok(Arc::new(generation))
    }

    async fn open_existing(&self, name: &str) -> CachegateResult<Option<Arc<dyn Generation>>> {
        if !self.has(name).await? {
            return Ok(None);
        }
        Ok(Some(Arc::new(FsGeneration::at(&self.root, name))))
    }

    async fn has(&self, name: &str) -> CachegateResult<bool> {
        if validate_generation_name(name).is_err() {
            return Ok(false);
        }
        Ok(self.marker(name).await?.is_some())
    }

    async fn names(&self) -> CachegateResult<Vec<String>> {
        Ok(self.markers().await?.into_iter().map(|m| m.name).collect())
    }

    async fn delete(&self, name: &str) -> CachegateResult<bool> {
        if !self.has(name).await? {
            return Ok(false);
        }

        let dir = self.root.join(name);
        // Drop the marker first so the generation disappears from listings
        // even if the recursive removal is interrupted.
        match fs::remove_file(dir.join(MARKER_FILE)).await {
            Ok(()) => {}
            // A concurrent delete got there first
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(CachegateError::io(format!("removing marker of {}", name), e))
            }
        }
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CachegateError::io(format!("removing {}", dir.display()), e)),
        }

        debug!("Deleted generation {}", name);
        Ok(true)
    }

    async fn match_any(&self, key: &RequestKey) -> CachegateResult<Option<Response>> {
        for marker in self.markers().await? {
            let generation = FsGeneration::at(&self.root, &marker.name);
            if let Some(response) = generation.lookup(key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn info(&self, name: &str) -> CachegateResult<Option<GenerationInfo>> {
        if validate_generation_name(name).is_err() {
            return Ok(None);
        }
        let Some(marker) = self.marker(name).await? else {
            return Ok(None);
        };
        let entries = FsGeneration::at(&self.root, name).entry_count().await?;
        Ok(Some(GenerationInfo {
            name: marker.name,
            created_at: marker.created_at,
            entries,
        }))
    }

    fn storage_name(&self) -> &'static str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Headers, ResponseType};
    use tempfile::TempDir;

    fn ok(url: &str, body: &str) -> Response {
        let headers: Headers = [("content-type", "text/plain")].into_iter().collect();
        Response::new(200, url, ResponseType::Basic, headers, body.as_bytes().to_vec())
    }

    fn storage() -> (FsStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        (FsStorage::new(temp.path().join("generations")), temp)
    }

    #[tokio::test]
    async fn empty_root_lists_nothing() {
        let (storage, _temp) = storage();
        assert!(storage.names().await.unwrap().is_empty());
        assert!(!storage.has("v1").await.unwrap());
    }

    #[tokio::test]
    async fn put_and_lookup_survive_reopen() {
        let (storage, temp) = storage();
        let key = RequestKey::get("https://a.test/index.html");
        storage
            .open("v1")
            .await
            .unwrap()
            .put(key.clone(), ok("https://a.test/index.html", "<html>"))
            .await
            .unwrap();

        let reopened = FsStorage::new(temp.path().join("generations"));
        let mut hit = reopened.open("v1").await.unwrap().lookup(&key).await.unwrap().unwrap();
        assert_eq!(hit.status(), 200);
        assert_eq!(hit.headers().get("content-type"), Some("text/plain"));
        assert_eq!(hit.text().unwrap(), "<html>");
    }

    #[tokio::test]
    async fn put_overwrites_entry() {
        let (storage, _temp) = storage();
        let generation = storage.open("v1").await.unwrap();
        let key = RequestKey::get("https://a.test/data.json");

        generation.put(key.clone(), ok("https://a.test/data.json", "old")).await.unwrap();
        generation.put(key.clone(), ok("https://a.test/data.json", "new")).await.unwrap();

        let mut hit = generation.lookup(&key).await.unwrap().unwrap();
        assert_eq!(hit.text().unwrap(), "new");
        assert_eq!(generation.keys().await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn lookup_miss_is_none() {
        let (storage, _temp) = storage();
        let generation = storage.open("v1").await.unwrap();
        let miss = generation
            .lookup(&RequestKey::get("https://a.test/none"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn delete_removes_directory() {
        let (storage, _temp) = storage();
        storage.open("old").await.unwrap();
        storage.open("new").await.unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert!(!storage.root().join("old").exists());
        assert_eq!(storage.names().await.unwrap(), vec!["new"]);
    }

    #[tokio::test]
    async fn open_existing_never_creates() {
        let (storage, _temp) = storage();
        assert!(storage.open_existing("v1").await.unwrap().is_none());
        assert!(!storage.root().join("v1").exists());

        storage.open("v1").await.unwrap();
        assert!(storage.open_existing("v1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn put_into_deleted_generation_fails_without_recreating() {
        let (storage, _temp) = storage();
        let generation = storage.open("v1").await.unwrap();
        assert!(storage.delete("v1").await.unwrap());

        let err = generation
            .put(RequestKey::get("https://a.test/x"), ok("https://a.test/x", "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, CachegateError::GenerationMissing(ref name) if name == "v1"));
        assert!(!storage.root().join("v1").exists());
        assert!(storage.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_deletes_report_one_success() {
        let (storage, _temp) = storage();
        storage.open("old").await.unwrap();
        let (first, second) = tokio::join!(storage.delete("old"), storage.delete("old"));

        let deleted = [first.unwrap(), second.unwrap()];
        assert_eq!(deleted.iter().filter(|d| **d).count(), 1);
        assert!(storage.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn match_any_does_not_create() {
        let (storage, _temp) = storage();
        let key = RequestKey::get("https://a.test/x");
        assert!(storage.match_any(&key).await.unwrap().is_none());
        assert!(storage.names().await.unwrap().is_empty());

        storage
            .open("v2")
            .await
            .unwrap()
            .put(key.clone(), ok("https://a.test/x", "x"))
            .await
            .unwrap();
        assert!(storage.match_any(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn info_reports_entries() {
        let (storage, _temp) = storage();
        let generation = storage.open("v1").await.unwrap();
        generation
            .put(RequestKey::get("https://a.test/1"), ok("https://a.test/1", "same"))
            .await
            .unwrap();
        generation
            .put(RequestKey::get("https://a.test/2"), ok("https://a.test/2", "same"))
            .await
            .unwrap();

        let info = storage.info("v1").await.unwrap().unwrap();
        assert_eq!(info.name, "v1");
        assert_eq!(info.entries, 2);
        assert!(storage.info("v9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn directories_without_marker_are_ignored() {
        let (storage, _temp) = storage();
        std::fs::create_dir_all(storage.root().join("stray")).unwrap();
        storage.open("v1").await.unwrap();
        assert_eq!(storage.names().await.unwrap(), vec!["v1"]);
    }
}
