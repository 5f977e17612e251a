//! Transport abstraction
//!
//! The controller never performs network I/O itself; it hands requests to a
//! [`Transport`]. The shipped implementation talks HTTP through `ureq`.

use crate::config::schema::TransportConfig;
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::request::{origin_of, Headers, Request};
use crate::fetch::response::{Response, ResponseType};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, RequestBuilder, ResponseExt};

/// Abstract fetch primitive
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request.
    ///
    /// HTTP error statuses are responses, not errors. Only a missing
    /// response (offline, DNS, connection reset, timeout) is reported as
    /// [`CachegateError::NetworkUnavailable`].
    async fn fetch(&self, request: Request) -> CachegateResult<Response>;

    /// Human-readable transport name for display
    fn transport_name(&self) -> &'static str;
}

/// Blocking `ureq` agent driven from the async runtime's blocking pool
pub struct HttpTransport {
    agent: Agent,
    origin: String,
    user_agent: String,
}

impl HttpTransport {
    /// Create a transport for the controller scoped at `origin`
    pub fn new(origin: &str, config: &TransportConfig) -> CachegateResult<Self> {
        let origin = origin_of(origin).ok_or_else(|| CachegateError::InvalidUrl {
            url: origin.to_string(),
            reason: "origin must be an absolute http(s) URL".to_string(),
        })?;

        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            origin,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Classify a response by comparing its URL with the controller origin
    fn classify(origin: &str, url: &str) -> ResponseType {
        match origin_of(url) {
            Some(o) if o == origin => ResponseType::Basic,
            _ => ResponseType::Cors,
        }
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &Headers,
    user_agent: &str,
) -> RequestBuilder<B> {
    if headers.get("user-agent").is_none() {
        builder = builder.header("user-agent", user_agent);
    }
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

fn call(
    agent: &Agent,
    method: &str,
    url: &str,
    headers: &Headers,
    body: &[u8],
    user_agent: &str,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match method {
        "HEAD" => with_headers(agent.head(url), headers, user_agent).call(),
        "DELETE" => with_headers(agent.delete(url), headers, user_agent).call(),
        "OPTIONS" => with_headers(agent.options(url), headers, user_agent).call(),
        "POST" => with_headers(agent.post(url), headers, user_agent).send(body),
        "PUT" => with_headers(agent.put(url), headers, user_agent).send(body),
        "PATCH" => with_headers(agent.patch(url), headers, user_agent).send(body),
        _ => with_headers(agent.get(url), headers, user_agent).call(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: Request) -> CachegateResult<Response> {
        let (method, url, headers, body) = request.into_parts()?;
        debug!(%method, %url, "network fetch");

        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let origin = self.origin.clone();

        tokio::task::spawn_blocking(move || {
            let mut response = call(&agent, &method, &url, &headers, &body, &user_agent)
                .map_err(|e| CachegateError::network(&url, e))?;

            // Redirects may leave the origin; classify where we ended up
            let final_url = response.get_uri().to_string();
            let kind = Self::classify(&origin, &final_url);
            let status = response.status().as_u16();
            let response_headers: Headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let bytes = response
                .body_mut()
                .read_to_vec()
                .map_err(|e| CachegateError::network(&url, e))?;

            debug!(%url, %final_url, status, bytes = bytes.len(), "network response");
            Ok(Response::new(status, final_url, kind, response_headers, bytes))
        })
        .await
        .map_err(|e| CachegateError::Internal(format!("fetch task failed: {}", e)))?
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}
