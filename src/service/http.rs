use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::{QaError, Result};

/// Longest slice of an unparseable body quoted back in an error.
const BODY_EXCERPT_CHARS: usize = 200;

/// Blocking JSON-over-HTTP transport shared by the backends.
///
/// Non-2xx responses are returned rather than raised so the caller can
/// decode the provider's error body. Requests are never retried.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    base_url: Url,
    agent: ureq::Agent,
    bearer_token: Option<String>,
}

#[derive(Debug)]
pub(crate) struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as `T`, whatever the status code.
    pub(crate) fn decode<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            let excerpt: String = self.body.chars().take(BODY_EXCERPT_CHARS).collect();
            QaError::Service(format!(
                "Malformed {} response (HTTP {}): {}; body: {}",
                what, self.status, e, excerpt
            ))
        })
    }
}

impl HttpTransport {
    pub(crate) fn new(base_url: Url, timeout: Duration) -> Self {
        Self {
            base_url,
            agent: build_agent(timeout),
            bearer_token: None,
        }
    }

    pub(crate) fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> Result<HttpReply> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let mut request = self.agent.get(url.as_str());
        if let Some(token) = &self.bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.call().map_err(|e| transport_error(&url, &e))?;
        read_reply(&url, response)
    }

    pub(crate) fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<HttpReply> {
        let url = self.endpoint(path)?;
        let request_json = serde_json::to_string(payload)
            .map_err(|e| QaError::Service(format!("Failed to serialize request: {}", e)))?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send(&request_json)
            .map_err(|e| transport_error(&url, &e))?;
        read_reply(&url, response)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| QaError::Service(format!("Failed to build URL for {}: {}", path, e)))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn read_reply(url: &Url, mut response: ureq::http::Response<ureq::Body>) -> Result<HttpReply> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| transport_error(url, &e))?;

    if !(200..300).contains(&status) {
        warn!("{} returned HTTP {}", url, status);
    }

    Ok(HttpReply { status, body })
}

fn transport_error(url: &Url, error: &ureq::Error) -> QaError {
    warn!("Request to {} failed: {}", url, error);
    QaError::Service(format!("Request to {} failed: {}", url, error))
}
