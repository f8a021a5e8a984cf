//! Durable queue storage.
//!
//! `QueueStore` is the seam between the coordinator and the persistent
//! medium. Two implementations ship:
//!
//! - [`RedbQueueStore`]: redb file, durable on commit. The production store.
//! - [`MemoryQueueStore`]: in-process map with the same ordering rules, for
//!   tests and hosts without a writable disk.
//!
//! # Key design
//!
//! Both stores order entries by a 16-byte composite key:
//! ```text
//! [ enqueued_at_ms: u64 big-endian (8 bytes) | seq: u64 big-endian (8 bytes) ]
//! ```
//!
//! Big-endian timestamps in the high bytes make byte order equal time order.
//! The sequence suffix keeps two inserts in the same millisecond from
//! overwriting each other, and preserves their insertion order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::action::{ActionTarget, QueuedAction};
use crate::error::Result;

pub mod memory;
pub mod redb_store;

pub use self::memory::{FailMode, MemoryQueueStore};
pub use self::redb_store::RedbQueueStore;

// ---------------------------------------------------------------------------
// QueueStore
// ---------------------------------------------------------------------------

/// Insert / full-scan / full-clear over pending actions.
///
/// There is no per-item delete or update; actions leave the store only
/// through `clear_all`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new action stamped with the store's clock. Returns once the
    /// write is durable.
    async fn enqueue(&self, target: ActionTarget, payload: serde_json::Value)
        -> Result<QueuedAction>;

    /// Every pending action, oldest first. A point-in-time snapshot.
    async fn list_all(&self) -> Result<Vec<QueuedAction>>;

    /// Remove every pending action in one atomic step.
    async fn clear_all(&self) -> Result<()>;

    async fn len(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of `enqueued_at` timestamps. Injected so tests can pin time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

pub(crate) type QueueKey = [u8; 16];

pub(crate) fn encode_key(ms: u64, seq: u64) -> QueueKey {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&ms.to_be_bytes());
    key[8..].copy_from_slice(&seq.to_be_bytes());
    key
}

pub(crate) fn decode_key(bytes: &[u8]) -> Option<(u64, u64)> {
    if bytes.len() != 16 {
        return None;
    }
    let mut ms = [0u8; 8];
    let mut seq = [0u8; 8];
    ms.copy_from_slice(&bytes[..8]);
    seq.copy_from_slice(&bytes[8..]);
    Some((u64::from_be_bytes(ms), u64::from_be_bytes(seq)))
}

/// Pick the key for a new insert given the newest existing key.
///
/// A clock reading at or before the newest key reuses that key's timestamp
/// with the next sequence number, so order stays non-decreasing even if the
/// wall clock steps backwards.
pub(crate) fn next_key(newest: Option<(u64, u64)>, now_ms: u64) -> (u64, u64) {
    match newest {
        Some((ms, seq)) if now_ms <= ms => (ms, seq.saturating_add(1)),
        _ => (now_ms, 0),
    }
}

pub(crate) fn clamp_ms(ts: DateTime<Utc>) -> u64 {
    ts.timestamp_millis().max(0) as u64
}

/// The timestamp recorded on an action stored under key timestamp `ms`.
pub(crate) fn stamp(ms: u64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(fallback)
}
