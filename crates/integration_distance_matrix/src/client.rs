//! Distance Matrix client façade
//!
//! [`DistanceMatrixClient`] turns a [`DistanceMatrixQuery`] into a
//! [`PendingRequest`]. Each submission runs on its own tokio task which waits
//! for the shared rate limiter, performs the exchange through the configured
//! [`Transport`], retries a transient failure once, and publishes exactly one
//! outcome unless the request is cancelled first. The timeout window starts
//! at submission and covers queueing, retries and the retry interval.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Method;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, instrument, warn};

use crate::config::{Credentials, DistanceMatrixConfig};
use crate::error::DistanceMatrixError;
use crate::models::{ClientResponse, DistanceMatrixResponse};
use crate::pending::{CompletionCallback, PendingRequest, RequestResult, RequestShared};
use crate::query::DistanceMatrixQuery;
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

/// Path of the JSON endpoint, relative to the configured base URL
pub const DISTANCE_MATRIX_PATH: &str = "/maps/api/distancematrix/json";

/// Trait for Distance Matrix services
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DistanceMatrixService: Send + Sync {
    /// Submit a query and wait for its outcome
    async fn distance_matrix(&self, query: DistanceMatrixQuery) -> RequestResult;

    /// Check if the service is reachable
    async fn is_healthy(&self) -> bool;
}

struct ClientInner {
    config: DistanceMatrixConfig,
    credentials: Credentials,
    endpoint: String,
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
}

/// Distance Matrix client
///
/// Cheap to clone; clones share the rate limiter and connection pool.
#[derive(Clone)]
pub struct DistanceMatrixClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for DistanceMatrixClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceMatrixClient")
            .field("endpoint", &self.inner.endpoint)
            .field("timeout_ms", &self.inner.config.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl DistanceMatrixClient {
    /// Create a new client backed by `reqwest`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &DistanceMatrixConfig) -> Result<Self, DistanceMatrixError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout_ms, &config.user_agent)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a new client with a custom transport
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport(
        config: &DistanceMatrixConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DistanceMatrixError> {
        config.validate()?;
        let credentials = config.credentials()?;
        let endpoint = format!(
            "{}{DISTANCE_MATRIX_PATH}",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config: config.clone(),
                credentials,
                endpoint,
                transport,
                limiter: RateLimiter::new(&config.rate),
            }),
        })
    }

    /// The client configuration
    #[must_use]
    pub fn config(&self) -> &DistanceMatrixConfig {
        &self.inner.config
    }

    /// Submit a query
    ///
    /// The outcome is observed through [`PendingRequest::response`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the query is rejected before transmission,
    /// or `Configuration` if called outside a tokio runtime.
    pub fn submit(&self, query: &DistanceMatrixQuery) -> Result<PendingRequest, DistanceMatrixError> {
        self.submit_inner(query, None)
    }

    /// Submit a query with a completion callback
    ///
    /// `on_complete` is called at most once, with the same outcome that
    /// [`PendingRequest::response`] resolves to. It is never called if the
    /// request is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the query is rejected before transmission,
    /// or `Configuration` if called outside a tokio runtime.
    pub fn submit_with_callback<F>(
        &self,
        query: &DistanceMatrixQuery,
        on_complete: F,
    ) -> Result<PendingRequest, DistanceMatrixError>
    where
        F: FnOnce(RequestResult) + Send + 'static,
    {
        self.submit_inner(query, Some(Box::new(on_complete)))
    }

    #[instrument(
        skip(self, query, on_complete),
        fields(origins = query.origins.len(), destinations = query.destinations.len())
    )]
    fn submit_inner(
        &self,
        query: &DistanceMatrixQuery,
        on_complete: Option<CompletionCallback>,
    ) -> Result<PendingRequest, DistanceMatrixError> {
        let params = query.to_params(self.inner.config.language.as_ref())?;
        let runtime = Handle::try_current().map_err(|_| {
            DistanceMatrixError::Configuration(
                "requests must be submitted from within a tokio runtime".to_string(),
            )
        })?;

        let request = self.inner.build_request(params);
        let timeout_ms = self.inner.config.timeout_ms;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        let shared = RequestShared::new(on_complete);
        let span = debug_span!("distance_matrix_request", request_id = %shared.id());
        debug!(request_id = %shared.id(), "Request submitted");

        let inner = Arc::clone(&self.inner);
        let task_shared = Arc::clone(&shared);
        runtime.spawn(
            async move {
                let outcome = tokio::select! {
                    biased;
                    () = task_shared.cancelled() => {
                        debug!("Exchange abandoned after cancellation");
                        return;
                    },
                    outcome = tokio::time::timeout_at(deadline, inner.exchange(&request)) => {
                        outcome.unwrap_or_else(|_| {
                            warn!(timeout_ms, "Request timed out");
                            Err(DistanceMatrixError::Timeout { timeout_ms })
                        })
                    },
                };
                task_shared.complete(outcome);
            }
            .instrument(span),
        );

        Ok(PendingRequest::new(shared))
    }
}

impl ClientInner {
    fn build_request(&self, params: Vec<(&'static str, String)>) -> TransportRequest {
        let query = params
            .into_iter()
            .chain(self.credentials.params())
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        TransportRequest {
            method: Method::GET,
            url: self.endpoint.clone(),
            query,
            headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }

    async fn exchange(&self, request: &TransportRequest) -> RequestResult {
        let retried = with_retry(&self.config.retry, move || async move {
            self.limiter.acquire().await;
            debug!("Request admitted");
            let response = self.transport.send(request.clone()).await?;
            interpret(response)
        })
        .await;

        debug!(
            attempts = retried.attempts,
            duration_ms = u64::try_from(retried.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Exchange finished"
        );
        retried.into_result()
    }
}

/// Map a raw response onto an outcome
fn interpret(response: TransportResponse) -> RequestResult {
    let TransportResponse {
        status,
        headers,
        body,
    } = response;

    let transient = matches!(status, 500 | 503 | 504);
    let success = (200..300).contains(&status);

    // A decodable payload status wins over the HTTP status
    let json: DistanceMatrixResponse = match serde_json::from_str::<DistanceMatrixResponse>(&body) {
        Ok(json) if transient && json.status.is_ok() => {
            return Err(DistanceMatrixError::ServiceUnavailable { status });
        },
        Ok(json) => json,
        Err(_) if transient => return Err(DistanceMatrixError::ServiceUnavailable { status }),
        Err(e) if success => return Err(DistanceMatrixError::ParseError(e.to_string())),
        Err(_) => return Err(DistanceMatrixError::RequestFailed(format!("HTTP {status}"))),
    };

    let envelope = ClientResponse {
        status,
        headers,
        json,
    };

    if !envelope.json.status.is_ok() {
        warn!(
            status = %envelope.json.status,
            error_message = envelope.json.error_message.as_deref().unwrap_or_default(),
            "Service returned non-OK status"
        );
        return Err(DistanceMatrixError::Status(Box::new(envelope)));
    }

    if !success {
        return Err(DistanceMatrixError::RequestFailed(format!("HTTP {status}")));
    }

    debug!(
        rows = envelope.json.rows.len(),
        elements = envelope.json.element_count(),
        "Distance matrix received"
    );
    Ok(envelope)
}

#[async_trait]
impl DistanceMatrixService for DistanceMatrixClient {
    #[instrument(skip(self, query))]
    async fn distance_matrix(&self, query: DistanceMatrixQuery) -> RequestResult {
        let pending = self.submit(&query)?;
        pending.response().await
    }

    async fn is_healthy(&self) -> bool {
        let request = self.inner.build_request(Vec::new());
        self.inner.limiter.acquire().await;
        let check = tokio::time::timeout(
            Duration::from_millis(self.inner.config.timeout_ms),
            self.inner.transport.send(request),
        )
        .await;
        matches!(check, Ok(Ok(response)) if response.status < 500)
    }
}
