use async_trait::async_trait;
use brokerlink_core::RelayError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// HTTP verbs used against the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical upstream call, possibly spanning several attempts.
#[derive(Debug, Clone)]
pub struct RetryableRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub body: Option<Value>,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryableRequest {
    pub fn new(method: HttpMethod, url: Url, max_attempts: u32) -> Self {
        Self {
            url,
            method,
            body: None,
            max_attempts,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A single attempt as it goes on the wire.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// The parts of an HTTP response the client cares about.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if present.
    pub retry_after: Option<String>,
    pub body: String,
}

/// Sends one HTTP attempt. Network-level failures map to [`RelayError::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, RelayError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to initialize HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, RelayError> {
        let mut builder = self
            .client
            .request(request.method.as_reqwest(), request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(format!("Read error: {}", e)))?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
