//! Reachability probe: a connectivity source for hosts without a platform
//! online/offline event.
//!
//! Polls a health endpoint on an interval and publishes to a
//! `ConnectivitySignal` only when the observed state differs from the last
//! one published.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::connectivity::{Connectivity, ConnectivitySignal};
use crate::error::{OutboxError, Result};

pub struct ReachabilityProbe {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl ReachabilityProbe {
    pub fn new(url: impl Into<String>, interval: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OutboxError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request: any 2xx is online, anything else (including transport
    /// errors) is offline.
    pub async fn check(&self) -> Connectivity {
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => Connectivity::Online,
            Ok(resp) => {
                tracing::debug!(url = %self.url, status = %resp.status(), "health check failed");
                Connectivity::Offline
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "health endpoint unreachable");
                Connectivity::Offline
            }
        }
    }

    /// Poll forever, publishing state changes to `signal`.
    pub async fn run(self, signal: ConnectivitySignal) {
        let mut last = signal.current();
        loop {
            let observed = self.check().await;
            if observed != last {
                last = observed;
                signal.set(observed);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    pub fn spawn(self, signal: ConnectivitySignal) -> JoinHandle<()> {
        tokio::spawn(self.run(signal))
    }
}
