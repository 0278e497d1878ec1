//! Resilient HTTP transport shared by adapters that talk to a
//! registry over the network (e.g. [`crate::pypi::PyPiAdapter`]).
//!
//! Per-host rate limiting (`governor`) and exponential-backoff retry
//! on transient failures (`backon`) mirror the resilience policy used
//! for the knowledge-graph resolver's transport in `crucible-graph`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, StatusCode, header};
use tracing::warn;

use crate::adapter::transport_error;

type HostRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Transport configuration for [`ResilientClient`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures.
    pub max_retries: usize,
    /// Requests per second, per host.
    pub rate_limit_per_host: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            rate_limit_per_host: 20,
        }
    }
}

/// The outcome of a conditional GET: either a fresh body or a
/// confirmation that the cached body is still valid.
pub enum ConditionalResponse {
    /// Upstream returned a new body and (optionally) a fresh `ETag`.
    Fresh { body: String, etag: Option<String> },
    /// Upstream returned `304 Not Modified`.
    NotModified,
}

/// A `reqwest`-backed client with per-host rate limiting and
/// exponential-backoff retry on connection failures and 5xx/429
/// responses.
#[derive(Debug)]
pub struct ResilientClient {
    client: Client,
    config: TransportConfig,
    rate_limiters: DashMap<String, Arc<HostRateLimiter>>,
}

impl ResilientClient {
    /// Build a client with the given configuration.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("crucible/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            rate_limiters: DashMap::new(),
        }
    }

    fn rate_limiter(&self, host: &str) -> Arc<HostRateLimiter> {
        self.rate_limiters
            .entry(host.to_string())
            .or_insert_with(|| {
                let quota =
                    Quota::per_second(NonZeroU32::new(self.config.rate_limit_per_host).unwrap_or(NonZeroU32::MIN));
                Arc::new(RateLimiter::direct(quota))
            })
            .clone()
    }

    /// `GET url`, optionally sending `If-None-Match: etag`, retrying
    /// transient failures with exponential backoff.
    ///
    /// # Errors
    /// Returns an error if the request fails after all retries or the
    /// server responds with a non-success, non-304 status.
    pub async fn conditional_get(
        &self,
        url: &str,
        etag: Option<&str>,
    ) -> crucible_core::Result<ConditionalResponse> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let limiter = self.rate_limiter(&host);

        let attempt = || async {
            limiter.until_ready().await;
            let mut request = self.client.get(url);
            if let Some(tag) = etag {
                request = request.header(header::IF_NONE_MATCH, tag);
            }
            let response = request
                .send()
                .await
                .map_err(|e| transport_error("http get", e))?;

            let status = response.status();
            if status == StatusCode::NOT_MODIFIED {
                return Ok(ConditionalResponse::NotModified);
            }
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(transport_error("http get", format!("retryable status {status}")));
            }
            if !status.is_success() {
                return Err(transport_error("http get", format!("status {status}")));
            }

            let response_etag = response
                .headers()
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.map_err(|e| transport_error("http get body", e))?;
            Ok(ConditionalResponse::Fresh {
                body,
                etag: response_etag,
            })
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(100))
                    .with_max_delay(Duration::from_secs(5))
                    .with_max_times(self.config.max_retries),
            )
            .notify(|err, dur| warn!(error = %err, retry_in = ?dur, "retrying adapter request"))
            .await
    }
}
