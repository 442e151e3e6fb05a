//! Bounded-time HTTP retrieval of one target

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{instrument, trace};

use crate::storage::Target;

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The target answered and its body was read completely
    ///
    /// Any status code counts: the body of a 500 is recorded like any other.
    Succeeded { body: String, duration_secs: f64 },

    /// Connection, timeout or body read failure; nothing is recorded
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Succeeded { .. })
    }
}

/// Performs the GET for a target and measures how long it took
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,
}

impl FetchExecutor {
    /// Create an executor whose requests give up after `timeout`
    ///
    /// The timeout covers the whole exchange, including reading the body.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch the target once
    ///
    /// The duration spans from sending the request until the last byte of
    /// the body has been read.
    #[instrument(skip(self, target), fields(target_id = target.id, url = %target.url))]
    pub async fn execute(&self, target: &Target) -> FetchOutcome {
        let start = Instant::now();

        match self.fetch_body(&target.url).await {
            Ok(body) => {
                let duration_secs = start.elapsed().as_secs_f64();
                trace!("read {} bytes in {duration_secs:.3}s", body.len());
                FetchOutcome::Succeeded {
                    body,
                    duration_secs,
                }
            }
            Err(e) => FetchOutcome::Failed {
                reason: format!("{e:#}"),
            },
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        trace!("response status {}", response.status());

        response
            .text()
            .await
            .context("failed to read response body")
    }
}
