use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const OUTBOX_DIR: &str = ".outbox";
pub const CONFIG_FILE: &str = ".outbox/config.yaml";
pub const QUEUE_FILE: &str = ".outbox/queue.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn outbox_dir(root: &Path) -> PathBuf {
    root.join(OUTBOX_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured queue file: relative paths are taken from `root`.
pub fn queue_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
