pub mod clear;
pub mod config;
pub mod drain;
pub mod enqueue;
pub mod init;
pub mod list;
pub mod watch;

use anyhow::Context;
use outbox_core::{
    Connectivity, ConnectivitySignal, Coordinator, HttpSubmitter, OutboxConfig, ReachabilityProbe,
    RedbQueueStore,
};
use std::path::Path;
use std::sync::Arc;

pub(crate) fn load_config(root: &Path) -> anyhow::Result<OutboxConfig> {
    OutboxConfig::load(root).context("failed to load .outbox/config.yaml")
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

pub(crate) fn open_store(root: &Path, cfg: &OutboxConfig) -> anyhow::Result<RedbQueueStore> {
    let path = cfg.queue_path(root);
    RedbQueueStore::open(&path)
        .with_context(|| format!("failed to open queue at {}", path.display()))
}

pub(crate) fn probe(cfg: &OutboxConfig) -> anyhow::Result<ReachabilityProbe> {
    ReachabilityProbe::new(cfg.health_url(), cfg.probe_interval(), cfg.submit_timeout())
        .context("failed to build reachability probe")
}

/// Wire store, HTTP submitter, and a signal seeded with `initial`.
pub(crate) fn coordinator(
    root: &Path,
    cfg: &OutboxConfig,
    initial: Connectivity,
) -> anyhow::Result<Arc<Coordinator>> {
    let store = Arc::new(open_store(root, cfg)?);
    let submitter = Arc::new(
        HttpSubmitter::new(cfg.api_base_url.clone(), cfg.submit_timeout())
            .context("failed to build http submitter")?,
    );
    let signal = ConnectivitySignal::new(initial);
    Ok(Arc::new(
        Coordinator::new(store, submitter, signal).drain_on_start(cfg.drain_on_start),
    ))
}
