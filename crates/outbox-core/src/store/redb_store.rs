//! Durable queue store backed by redb.
//!
//! A single `ACTIONS` table maps the 16-byte composite key (see the parent
//! module) to a JSON-encoded `QueuedAction`. Every write is its own redb
//! transaction and is durable once `commit()` returns.
//!
//! The database file is opened for each operation and closed when it
//! finishes, so several processes can share one queue file. redb holds an
//! exclusive lock while open; an operation that finds the file busy retries
//! until `lock_wait` elapses.
//!
//! redb is synchronous; each operation runs on tokio's blocking pool so a
//! slow disk never stalls the event loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redb::{Database, DatabaseError, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{clamp_ms, decode_key, encode_key, next_key, stamp, system_clock, Clock, QueueStore};
use crate::action::{ActionTarget, QueuedAction};
use crate::error::{OutboxError, Result};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: 16-byte composite (timestamp_ms big-endian ++ seq big-endian)
/// Value: JSON-encoded QueuedAction
const ACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("actions");

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(3);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(15);

// ---------------------------------------------------------------------------
// RedbQueueStore
// ---------------------------------------------------------------------------

/// Persistent queue of pending actions.
#[derive(Clone)]
pub struct RedbQueueStore {
    path: Arc<PathBuf>,
    /// Serializes this handle's operations so they never contend with each
    /// other for the file lock.
    gate: Arc<Mutex<()>>,
    lock_wait: Duration,
    clock: Clock,
}

impl RedbQueueStore {
    /// Create the redb database at `path` if needed and check that it opens.
    ///
    /// Creates parent directories and the `ACTIONS` table if missing. Fails
    /// with `StoreUnavailable` if the file cannot be created, or if another
    /// process keeps it open for longer than the lock wait.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(OutboxError::store)?;
            }
        }
        let store = Self {
            path: Arc::new(path.to_path_buf()),
            gate: Arc::new(Mutex::new(())),
            lock_wait: DEFAULT_LOCK_WAIT,
            clock: system_clock(),
        };
        let db = connect(&store.path, store.lock_wait)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(OutboxError::store)?;
        wt.open_table(ACTIONS).map_err(OutboxError::store)?;
        wt.commit().map_err(OutboxError::store)?;
        tracing::debug!(path = %path.display(), "opened queue store");
        Ok(store)
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// How long an operation waits for another process to release the file.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let path = Arc::clone(&self.path);
        let gate = Arc::clone(&self.gate);
        let wait = self.lock_wait;
        tokio::task::spawn_blocking(move || {
            let _held = gate
                .lock()
                .map_err(|_| OutboxError::store("queue store gate poisoned"))?;
            let db = connect(&path, wait)?;
            f(&db)
        })
        .await
        .map_err(OutboxError::store)?
    }
}

/// Open the database file, retrying while another handle holds its lock.
fn connect(path: &Path, wait: Duration) -> Result<Database> {
    let deadline = Instant::now() + wait;
    loop {
        match Database::create(path) {
            Ok(db) => return Ok(db),
            Err(DatabaseError::DatabaseAlreadyOpen) if Instant::now() < deadline => {
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(e) => return Err(OutboxError::store(e)),
        }
    }
}

fn insert(
    db: &Database,
    target: ActionTarget,
    payload: serde_json::Value,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<QueuedAction> {
    let wt = db.begin_write().map_err(OutboxError::store)?;
    let action = {
        let mut table = wt.open_table(ACTIONS).map_err(OutboxError::store)?;
        let newest = table
            .last()
            .map_err(OutboxError::store)?
            .and_then(|(k, _)| decode_key(k.value()));
        let (ms, seq) = next_key(newest, clamp_ms(now));
        let action = QueuedAction::new(target, payload, stamp(ms, now));
        let value = serde_json::to_vec(&action).map_err(OutboxError::store)?;
        let key = encode_key(ms, seq);
        table
            .insert(key.as_slice(), value.as_slice())
            .map_err(OutboxError::store)?;
        action
    };
    wt.commit().map_err(OutboxError::store)?;
    Ok(action)
}

fn scan(db: &Database) -> Result<Vec<QueuedAction>> {
    let rt = db.begin_read().map_err(OutboxError::store)?;
    let table = rt.open_table(ACTIONS).map_err(OutboxError::store)?;

    let mut result = Vec::new();
    for entry in table.iter().map_err(OutboxError::store)? {
        let (_, v) = entry.map_err(OutboxError::store)?;
        let action: QueuedAction =
            serde_json::from_slice(v.value()).map_err(OutboxError::store)?;
        result.push(action);
    }
    Ok(result)
}

fn clear(db: &Database) -> Result<()> {
    let wt = db.begin_write().map_err(OutboxError::store)?;
    // Drop and recreate inside one transaction: either every entry goes or none.
    wt.delete_table(ACTIONS).map_err(OutboxError::store)?;
    wt.open_table(ACTIONS).map_err(OutboxError::store)?;
    wt.commit().map_err(OutboxError::store)?;
    Ok(())
}

fn count(db: &Database) -> Result<usize> {
    let rt = db.begin_read().map_err(OutboxError::store)?;
    let table = rt.open_table(ACTIONS).map_err(OutboxError::store)?;
    let n = table.len().map_err(OutboxError::store)?;
    Ok(n as usize)
}

#[async_trait]
impl QueueStore for RedbQueueStore {
    async fn enqueue(
        &self,
        target: ActionTarget,
        payload: serde_json::Value,
    ) -> Result<QueuedAction> {
        let now = (self.clock)();
        let action = self
            .blocking(move |db| insert(db, target, payload, now))
            .await?;
        tracing::debug!(id = %action.id, dest = %action.target, "enqueued action");
        Ok(action)
    }

    async fn list_all(&self) -> Result<Vec<QueuedAction>> {
        self.blocking(scan).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.blocking(clear).await?;
        tracing::debug!("cleared queue store");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        self.blocking(count).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
