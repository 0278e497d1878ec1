//! Optional Consul-shaped key-value sink (§6): writes inference
//! metadata and each starting environment through Consul's HTTP KV
//! API, never its gRPC/DNS interfaces.

use crucible_config::ConsulSink;
use crucible_core::{CrucibleError, Environment, Result};

use crate::report::InferenceReport;

/// A thin client over `PUT /v1/kv/<key>`.
pub struct ConsulWriter {
    client: reqwest::Client,
    sink: ConsulSink,
}

impl ConsulWriter {
    #[must_use]
    pub fn new(sink: ConsulSink) -> Self {
        Self {
            client: reqwest::Client::new(),
            sink,
        }
    }

    /// Writes `<prefix>/runs/<run_id>/metadata` with the full report,
    /// then `<prefix>/runs/<run_id>/environments/<env_id>` for every
    /// root environment the caller resolved (§6).
    pub async fn publish(&self, report: &InferenceReport, roots: &[Environment]) -> Result<()> {
        let metadata_key = format!("{}/runs/{}/metadata", self.sink.key_prefix, report.run_id);
        self.put(&metadata_key, report).await?;

        for root in roots {
            let key = format!("{}/runs/{}/environments/{}", self.sink.key_prefix, report.run_id, root.id);
            self.put(&key, root).await?;
        }
        Ok(())
    }

    async fn put<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let url = format!("{}/v1/kv/{}", self.sink.address.trim_end_matches('/'), key);
        let body = crucible_core::json::to_json_pretty(value)?;
        let response = self
            .client
            .put(&url)
            .body(body)
            .send()
            .await
            .map_err(|e| CrucibleError::UnexpectedInference {
                message: format!("consul PUT {key} failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(CrucibleError::UnexpectedInference {
                message: format!("consul PUT {key} returned {}", response.status()),
            });
        }
        Ok(())
    }
}
