//! Network and cached responses

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::body::Body;
use crate::fetch::request::Headers;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the response relates to the controller's origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response, fully inspectable
    Basic,
    /// Cross-origin response delivered with CORS
    Cors,
    /// Cross-origin response whose status and body cannot be inspected
    Opaque,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Cors => write!(f, "cors"),
            Self::Opaque => write!(f, "opaque"),
        }
    }
}

/// Where a response handed to the caller came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Cache,
    Network,
}

impl fmt::Display for Served {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A single-use response
///
/// Like [`Request`](crate::fetch::Request) this is not `Clone`; storing a
/// response in a generation consumes it.
#[derive(Debug)]
pub struct Response {
    status: u16,
    url: String,
    kind: ResponseType,
    headers: Headers,
    body: Body,
    served: Served,
}

impl Response {
    /// Create a network response
    pub fn new(
        status: u16,
        url: impl Into<String>,
        kind: ResponseType,
        headers: Headers,
        body: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            status,
            url: url.into(),
            kind,
            headers,
            body: Body::new(body),
            served: Served::Network,
        }
    }

    /// Mark the response as coming from a cache generation
    pub(crate) fn from_cache(mut self) -> Self {
        self.served = Served::Cache;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> ResponseType {
        self.kind
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn served(&self) -> Served {
        self.served
    }

    /// 2xx status
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Eligible for write-behind: a same-origin 200
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseType::Basic
    }

    /// Copy the response before its body is read.
    ///
    /// Fails once the body has been consumed.
    pub fn duplicate(&self) -> CachegateResult<Self> {
        let body = self
            .body
            .duplicate()
            .ok_or_else(|| CachegateError::BodyUsed(self.url.clone()))?;
        Ok(Self {
            status: self.status,
            url: self.url.clone(),
            kind: self.kind,
            headers: self.headers.clone(),
            body,
            served: self.served,
        })
    }

    /// Read the body, consuming it
    pub fn bytes(&mut self) -> CachegateResult<Arc<[u8]>> {
        self.body
            .take()
            .ok_or_else(|| CachegateError::BodyUsed(self.url.clone()))
    }

    /// Read the body as UTF-8 text (lossy)
    pub fn text(&mut self) -> CachegateResult<String> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Whether the body has already been read
    pub fn body_used(&self) -> bool {
        self.body.is_used()
    }
}
