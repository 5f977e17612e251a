//! Intercepted requests and their cache keys

use crate::error::{CachegateError, CachegateResult};
use crate::fetch::body::Body;
use serde::{Deserialize, Serialize};
use std::fmt;
use ureq::http::Uri;

/// Ordered header list with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header list
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Append a header, keeping any existing values
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Identity of a request inside a cache generation: method plus URL
/// without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Build a key, normalizing the method and dropping any fragment
    pub fn new(method: &str, url: &str) -> Self {
        let url = url.split_once('#').map_or(url, |(base, _)| base);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    /// Key for a plain GET of `url`
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// Only GET entries can be stored or matched
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A single-use outbound request
///
/// Deliberately not `Clone`: forwarding a request consumes it, so a caller
/// that still needs it afterwards must [`duplicate`](Request::duplicate) it
/// first.
#[derive(Debug)]
pub struct Request {
    method: String,
    url: String,
    headers: Headers,
    body: Body,
}

impl Request {
    /// Create a request with an empty body
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
            headers: Headers::new(),
            body: Body::empty(),
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::new(body.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Cache key for this request
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Copy the request so it can be forwarded while the original is kept.
    ///
    /// Fails once the body has been consumed.
    pub fn duplicate(&self) -> CachegateResult<Self> {
        let body = self
            .body
            .duplicate()
            .ok_or_else(|| CachegateError::BodyUsed(self.url.clone()))?;
        Ok(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
        })
    }

    /// Consume the request into its parts
    pub fn into_parts(mut self) -> CachegateResult<(String, String, Headers, Vec<u8>)> {
        let body = self
            .body
            .take()
            .ok_or_else(|| CachegateError::BodyUsed(self.url.clone()))?;
        Ok((self.method, self.url, self.headers, body.to_vec()))
    }
}

/// `scheme://authority` of an absolute URL
pub fn origin_of(url: &str) -> Option<String> {
    let uri: Uri = url.parse().ok()?;
    let scheme = uri.scheme_str()?;
    let authority = uri.authority()?;
    Some(format!("{}://{}", scheme, authority.as_str().to_ascii_lowercase()))
}

/// Resolve a manifest entry or CLI argument against the controller origin.
///
/// Absolute URLs pass through untouched; paths are joined onto the origin.
pub fn resolve_url(origin: &str, target: &str) -> CachegateResult<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(CachegateError::InvalidUrl {
            url: target.to_string(),
            reason: "empty URL".to_string(),
        });
    }

    if origin_of(target).is_some() {
        return Ok(target.to_string());
    }

    let base = origin_of(origin).ok_or_else(|| CachegateError::InvalidUrl {
        url: origin.to_string(),
        reason: "origin must be an absolute http(s) URL".to_string(),
    })?;

    let resolved = if target.starts_with('/') {
        format!("{}{}", base, target)
    } else {
        format!("{}/{}", base, target)
    };

    resolved
        .parse::<Uri>()
        .map_err(|e| CachegateError::InvalidUrl {
            url: resolved.clone(),
            reason: e.to_string(),
        })?;

    Ok(resolved)
}
