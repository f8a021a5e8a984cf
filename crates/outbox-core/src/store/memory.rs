//! In-process queue store.
//!
//! Same key and ordering rules as the redb store, no durability. The
//! `FailMode` switch lets callers simulate a medium that has become
//! unavailable (quota exceeded, storage disabled).

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{clamp_ms, next_key, stamp, system_clock, Clock, QueueStore};
use crate::action::{ActionTarget, QueuedAction};
use crate::error::{OutboxError, Result};

/// Which operations a `MemoryQueueStore` rejects with `StoreUnavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    #[default]
    None,
    /// `enqueue` and `clear_all` fail; reads still succeed.
    Writes,
    /// Every operation fails.
    All,
}

struct Inner {
    entries: BTreeMap<(u64, u64), QueuedAction>,
    fail: FailMode,
}

pub struct MemoryQueueStore {
    inner: Mutex<Inner>,
    clock: Clock,
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                fail: FailMode::None,
            }),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_fail_mode(&self, mode: FailMode) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail = mode;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| OutboxError::StoreUnavailable("memory store lock poisoned".into()))
    }
}

fn check(inner: &Inner, write: bool) -> Result<()> {
    let unavailable = match inner.fail {
        FailMode::None => false,
        FailMode::Writes => write,
        FailMode::All => true,
    };
    if unavailable {
        return Err(OutboxError::StoreUnavailable(
            "memory store marked unavailable".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        target: ActionTarget,
        payload: serde_json::Value,
    ) -> Result<QueuedAction> {
        let now = (self.clock)();
        let mut inner = self.lock()?;
        check(&inner, true)?;
        let newest = inner.entries.keys().next_back().copied();
        let key = next_key(newest, clamp_ms(now));
        let action = QueuedAction::new(target, payload, stamp(key.0, now));
        inner.entries.insert(key, action.clone());
        Ok(action)
    }

    async fn list_all(&self) -> Result<Vec<QueuedAction>> {
        let inner = self.lock()?;
        check(&inner, false)?;
        Ok(inner.entries.values().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut inner = self.lock()?;
        check(&inner, true)?;
        inner.entries.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let inner = self.lock()?;
        check(&inner, false)?;
        Ok(inner.entries.len())
    }
}
