//! HTTP transport seam
//!
//! The façade hands a fully-built [`TransportRequest`] to a [`Transport`] and
//! gets back the raw status, headers and body. [`ReqwestTransport`] is the
//! default implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, Method};
use tracing::{debug, instrument};

use crate::error::DistanceMatrixError;

/// A request ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL without query string
    pub url: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Additional request headers
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    /// Value of the first query parameter with the given name
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// Response with a status and body and no headers
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }
}

/// Trait for HTTP transports
///
/// Implementations report connection failures as `ConnectionFailed` and
/// their own timeouts as `Timeout`; any HTTP status is a successful send.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the full response
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, DistanceMatrixError>;
}

/// `reqwest`-backed transport sharing one connection pool
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Create a new transport
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be initialized,
    /// for example when `user_agent` is not a valid header value.
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self, DistanceMatrixError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()
            .map_err(|e| DistanceMatrixError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { client, timeout_ms })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, DistanceMatrixError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DistanceMatrixError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                DistanceMatrixError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DistanceMatrixError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                DistanceMatrixError::RequestFailed(e.to_string())
            }
        })?;

        debug!(status, bytes = body.len(), "Response received");
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
