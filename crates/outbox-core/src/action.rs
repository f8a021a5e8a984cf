//! Queued action data model.
//!
//! A `QueuedAction` is the unit of deferred work: where to send it
//! (`ActionTarget`), what to send (`payload`), and when it was accepted
//! (`enqueued_at`). Records are never mutated once written.

use crate::error::{OutboxError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActionTarget
// ---------------------------------------------------------------------------

/// Destination and verb of a deferred write. Opaque to the queue; only a
/// `Submitter` interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTarget {
    /// Absolute URL, or a path resolved against the configured API base.
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "POST".to_string()
}

impl ActionTarget {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into().to_ascii_uppercase(),
        }
    }

    /// Like `new`, but rejects a method no HTTP client could send.
    pub fn checked(url: impl Into<String>, method: &str) -> Result<Self> {
        let target = Self::new(url, method);
        reqwest::Method::from_bytes(target.method.as_bytes())
            .map_err(|_| OutboxError::InvalidMethod(method.to_string()))?;
        Ok(target)
    }

    /// A `POST` to `url`, the common case for queued writes.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url, default_method())
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

// ---------------------------------------------------------------------------
// QueuedAction
// ---------------------------------------------------------------------------

/// A persisted write awaiting connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub id: Uuid,
    pub target: ActionTarget,
    pub payload: serde_json::Value,
    /// Milliseconds since the epoch on the wire; also the ordering key.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedAction {
    pub fn new(target: ActionTarget, payload: serde_json::Value, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            payload,
            enqueued_at,
        }
    }

    pub fn enqueued_at_ms(&self) -> i64 {
        self.enqueued_at.timestamp_millis()
    }
}
