use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OutboxConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Base URL that relative action targets and the health path resolve against.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Endpoint the reachability probe polls.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Per-request timeout for submissions and probes.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    #[serde(default = "default_drain_on_start")]
    pub drain_on_start: bool,
    #[serde(default = "default_queue_file")]
    pub queue_file: PathBuf,
}

fn default_api_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_health_path() -> String {
    "/api/test".to_string()
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_submit_timeout_secs() -> u64 {
    10
}

fn default_drain_on_start() -> bool {
    true
}

fn default_queue_file() -> PathBuf {
    PathBuf::from(paths::QUEUE_FILE)
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            health_path: default_health_path(),
            probe_interval_ms: default_probe_interval_ms(),
            submit_timeout_secs: default_submit_timeout_secs(),
            drain_on_start: default_drain_on_start(),
            queue_file: default_queue_file(),
        }
    }
}

impl OutboxConfig {
    /// Load `.outbox/config.yaml`, or defaults if it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: OutboxConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn queue_path(&self, root: &Path) -> PathBuf {
        paths::queue_path(root, &self.queue_file)
    }

    pub fn health_url(&self) -> String {
        crate::submit::resolve_url(&self.api_base_url, &self.health_path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "api_base_url '{}' must start with http:// or https://",
                    self.api_base_url
                ),
            });
        }

        if self.probe_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "probe_interval_ms must be greater than 0".to_string(),
            });
        } else if self.probe_interval_ms < 250 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "probe_interval_ms {} polls the health endpoint very often",
                    self.probe_interval_ms
                ),
            });
        }

        if self.submit_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "submit_timeout_secs must be greater than 0".to_string(),
            });
        }

        warnings
    }
}
