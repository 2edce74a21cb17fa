//! Session submission to the persistence endpoint
//!
//! The exported document is POSTed as-is; the server answers with the
//! identifier it assigned. Failures are reported to the caller and never
//! retried here: the user can retry or fall back to a local download.

use crate::infra::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Server acknowledgement of a stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("server responded with {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Status readout shown next to the submit affordance
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    InFlight,
    Submitted { session_id: String },
    Failed { error: String },
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Idle => "idle",
            SubmissionStatus::InFlight => "in_flight",
            SubmissionStatus::Submitted { .. } => "submitted",
            SubmissionStatus::Failed { .. } => "failed",
        }
    }

    /// Human-readable status line
    pub fn message(&self) -> String {
        match self {
            SubmissionStatus::Idle => String::new(),
            SubmissionStatus::InFlight => "Submitting session...".to_string(),
            SubmissionStatus::Submitted { session_id } => {
                format!("Submitted. Session ID: {session_id}")
            }
            SubmissionStatus::Failed { error } => format!("Failed to submit session: {error}"),
        }
    }
}

/// Destination for exported session documents
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn submit(&self, body: String) -> Result<SubmitReceipt, SubmitError>;
}

/// Submits over HTTP with a reused client
pub struct HttpSubmitter {
    url: String,
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // Create HTTP client once for reuse (connection pooling)
        let client = reqwest::Client::builder().timeout(timeout).http1_only().build()?;
        Ok(Self { url: url.to_string(), client })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.submit_url(), Duration::from_millis(config.submit_timeout_ms()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionSink for HttpSubmitter {
    async fn submit(&self, body: String) -> Result<SubmitReceipt, SubmitError> {
        let start = Instant::now();
        let bytes = body.len();

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.url, error = %e, "session_submit_unreachable");
                SubmitError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        if !status.is_success() {
            error!(url = %self.url, status = %status.as_u16(), latency_ms = %latency_ms, "session_submit_rejected");
            return Err(SubmitError::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;
        let receipt: SubmitReceipt = serde_json::from_str(&text)
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;

        info!(
            url = %self.url,
            session_id = %receipt.session_id,
            bytes = %bytes,
            latency_ms = %latency_ms,
            "session_submit_accepted"
        );
        Ok(receipt)
    }
}
