//! Delivery of actions to their destination.
//!
//! The coordinator only knows the [`Submitter`] trait. [`HttpSubmitter`] is
//! the stock implementation: it turns an `ActionTarget` into an HTTP request
//! with the payload as a JSON body.

use std::time::Duration;

use async_trait::async_trait;

use crate::action::ActionTarget;
use crate::error::{OutboxError, Result};

/// Sends one action. Any `Err` counts as a failed submission.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, target: &ActionTarget, payload: &serde_json::Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HttpSubmitter
// ---------------------------------------------------------------------------

pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmitter {
    /// `base_url` is prepended to targets given as a bare path (`/api/data`).
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OutboxError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn resolve(&self, url: &str) -> String {
        resolve_url(&self.base_url, url)
    }
}

/// Join `url` onto `base` unless it is already absolute.
pub fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, target: &ActionTarget, payload: &serde_json::Value) -> Result<()> {
        let failed = |reason: String| OutboxError::SubmissionFailed {
            target: target.to_string(),
            reason,
        };

        let method = reqwest::Method::from_bytes(target.method.as_bytes())
            .map_err(|_| failed(format!("invalid method '{}'", target.method)))?;
        let url = self.resolve(&target.url);

        let resp = self
            .client
            .request(method, &url)
            .json(payload)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(failed(format!("server responded {status}")));
        }
        tracing::debug!(dest = %target, %status, "submitted action");
        Ok(())
    }
}
