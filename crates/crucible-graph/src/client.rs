//! Transport for the knowledge-graph database: a scoped handle pool
//! plus a JSON-over-HTTP query executor that rate-limits and retries
//! transient failures with exponential backoff (§4.B), the same
//! `governor`+`backon` policy `crucible-adapters::http::ResilientClient`
//! uses for its own upstream.
//!
//! Retry only bridges transient transport hiccups (connection resets,
//! 5xx/429 responses); once retries are exhausted the failure still
//! propagates to the caller per §7 ("Graph-query failures ...
//! propagate") — nothing here recovers locally or swallows a query
//! failure.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::error::query_error;

type EndpointRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A scoped graph-database handle, acquired from a bounded pool and
/// released on every exit path (including panics/early returns) via
/// `Drop`, per §5 "Shared resource policy".
#[derive(Debug)]
pub struct GraphHandle {
    _permit: OwnedSemaphorePermit,
}

/// Configuration for [`GraphClient`].
#[derive(Debug, Clone)]
pub struct GraphClientConfig {
    /// Base URL of the graph database's query endpoint.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of concurrently held handles.
    pub max_concurrent_handles: usize,
    /// Maximum retry attempts for transient query failures.
    pub max_retries: usize,
    /// Query requests per second allowed against the endpoint.
    pub rate_limit_per_second: u32,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7474/query".to_string(),
            timeout: Duration::from_secs(15),
            max_concurrent_handles: 16,
            max_retries: 3,
            rate_limit_per_second: 20,
        }
    }
}

/// Executes the four parameterized queries of §4.B against an
/// external graph database over HTTP, one JSON document per query.
#[derive(Debug)]
pub struct GraphClient {
    http: Client,
    endpoint: String,
    handles: Arc<Semaphore>,
    rate_limiter: Arc<EndpointRateLimiter>,
    max_retries: usize,
}

impl GraphClient {
    /// Build a client from `config`.
    #[must_use]
    pub fn new(config: GraphClientConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("crucible/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let quota = Quota::per_second(
            std::num::NonZeroU32::new(config.rate_limit_per_second).unwrap_or(std::num::NonZeroU32::MIN),
        );
        Self {
            http,
            endpoint: config.endpoint,
            handles: Arc::new(Semaphore::new(config.max_concurrent_handles.max(1))),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            max_retries: config.max_retries,
        }
    }

    /// Acquire a scoped handle. The caller must hold it for the
    /// lifetime of its query group; it releases automatically when
    /// dropped, on every exit path.
    ///
    /// # Errors
    /// Returns an error only if the pool has been poisoned (the
    /// semaphore closed), which does not happen in normal operation.
    pub async fn acquire(&self) -> crucible_core::Result<GraphHandle> {
        let permit = Arc::clone(&self.handles)
            .acquire_owned()
            .await
            .map_err(|e| query_error("acquire handle", e))?;
        Ok(GraphHandle { _permit: permit })
    }

    /// Run one named query with `params`, under an already-acquired
    /// `handle`. Transient failures (connection errors, 5xx/429
    /// responses) are retried with exponential backoff under the
    /// endpoint's rate limit; once retries are exhausted the failure
    /// propagates to the caller per §7.
    ///
    /// # Errors
    /// Returns an error if every retry attempt fails, or immediately
    /// on a non-retryable status or malformed JSON in the response
    /// body.
    pub async fn run_query<P, R>(&self, _handle: &GraphHandle, query_name: &str, params: &P) -> crucible_core::Result<R>
    where
        P: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let body = serde_json::json!({ "query": query_name, "params": params });

        let attempt = || async {
            self.rate_limiter.until_ready().await;
            let response = self
                .http
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| query_error(query_name, e))?;

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(query_error(query_name, format!("retryable status {status}")));
            }
            if !status.is_success() {
                return Err(query_error(query_name, format!("status {status}")));
            }

            response
                .json::<R>()
                .await
                .map_err(|e| query_error(query_name, format!("malformed response: {e}")))
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(100))
                    .with_max_delay(Duration::from_secs(5))
                    .with_max_times(self.max_retries),
            )
            .notify(|err, dur| warn!(query = query_name, error = %err, retry_in = ?dur, "retrying graph query"))
            .await
    }

    /// Run `query_name` the same way as [`Self::run_query`], except a
    /// `404` response is treated as "this query's subgraph is absent
    /// for this deployment" (`Ok(None)`) rather than a failure —
    /// distinct from a `200` with an empty body, which means the
    /// subgraph exists but has nothing for these params (§4.B:
    /// "the `upgrade` subgraph is optional — absence triggers the
    /// 'no matrix' branch").
    ///
    /// # Errors
    /// Returns an error if every retry attempt fails, or immediately
    /// on a non-retryable, non-404 status or malformed JSON.
    pub async fn run_optional_query<P, R>(&self, _handle: &GraphHandle, query_name: &str, params: &P) -> crucible_core::Result<Option<R>>
    where
        P: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let body = serde_json::json!({ "query": query_name, "params": params });

        let attempt = || async {
            self.rate_limiter.until_ready().await;
            let response = self
                .http
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| query_error(query_name, e))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(query_error(query_name, format!("retryable status {status}")));
            }
            if !status.is_success() {
                return Err(query_error(query_name, format!("status {status}")));
            }

            response
                .json::<R>()
                .await
                .map(Some)
                .map_err(|e| query_error(query_name, format!("malformed response: {e}")))
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(100))
                    .with_max_delay(Duration::from_secs(5))
                    .with_max_times(self.max_retries),
            )
            .notify(|err, dur| warn!(query = query_name, error = %err, retry_in = ?dur, "retrying graph query"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Empty {}

    #[tokio::test]
    async fn run_query_retries_a_transient_status_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = GraphClient::new(GraphClientConfig {
            endpoint: server.uri(),
            ..Default::default()
        });
        let handle = client.acquire().await.unwrap();

        let result: Empty = client.run_query(&handle, "resource_to_packages", &serde_json::json!({})).await.unwrap();
        let _ = result;
    }

    #[tokio::test]
    async fn run_query_propagates_once_retries_are_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = GraphClient::new(GraphClientConfig {
            endpoint: server.uri(),
            max_retries: 1,
            ..Default::default()
        });
        let handle = client.acquire().await.unwrap();

        let result = client.run_query::<_, Empty>(&handle, "resource_to_packages", &serde_json::json!({})).await;
        assert!(result.is_err(), "failure must still propagate once retries are exhausted");
    }
}
