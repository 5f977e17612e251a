//! Stored response snapshots and generation metadata

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{Headers, RequestKey, Response, ResponseType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Everything about a cached response except its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Request identity the snapshot was stored under
    pub key: RequestKey,
    pub status: u16,
    /// URL the response was fetched from
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResponseType,
    pub headers: Headers,
    /// SHA256 of the body, hex encoded
    pub body_digest: String,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Snapshot a response, consuming it. Returns metadata and body bytes.
    pub fn capture(key: RequestKey, mut response: Response) -> CachegateResult<(Self, Arc<[u8]>)> {
        let body = response.bytes()?;
        let meta = Self {
            key,
            status: response.status(),
            url: response.url().to_string(),
            kind: response.kind(),
            headers: response.headers().clone(),
            body_digest: digest_hex(&body),
            stored_at: Utc::now(),
        };
        Ok((meta, body))
    }

    /// Rebuild a fresh, unread response from the snapshot
    pub fn to_response(&self, body: Arc<[u8]>) -> Response {
        Response::new(
            self.status,
            self.url.clone(),
            self.kind,
            self.headers.clone(),
            body,
        )
        .from_cache()
    }
}

/// Summary of one cache generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub entries: usize,
}

/// Hex SHA256 of arbitrary bytes
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Reject names that cannot be used as a single path component
pub fn validate_generation_name(name: &str) -> CachegateResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(CachegateError::InvalidGenerationName(name.to_string()))
    }
}
