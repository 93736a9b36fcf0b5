use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// One replica endpoint: an authority such as `"media1:8080"`, `"10.0.1.2"`
/// or a bracketed IPv6 form like `"[::1]:8080"`. The scheme and path prefix
/// come from [`StorageConfig::base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(pub String);

impl Host {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(value: &str) -> Self {
        Host(value.to_string())
    }
}

impl From<String> for Host {
    fn from(value: String) -> Self {
        Host(value)
    }
}

/// Configuration for one replica set. Supplied explicitly at construction;
/// nothing in the crate reads ambient global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The full host set. Fixed for the lifetime of a replicator.
    pub hosts: Vec<Host>,
    /// Scheme plus path prefix, e.g. `"http://media.example.com/media/"`.
    /// The authority is replaced per host when building request URLs; the
    /// prefix is also what [`crate::storage::DistributedStorage::url`] joins
    /// public names onto.
    pub base_url: String,
    /// Per-call network timeout in seconds. A call cut off by this timeout
    /// counts as a transient failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// When set, reads are served from this directory and writes land there
    /// before being replicated ("hybrid" mode).
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

fn default_timeout_secs() -> f64 {
    2.0
}

impl StorageConfig {
    pub fn new(hosts: Vec<Host>, base_url: impl Into<String>) -> Self {
        Self {
            hosts,
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            local_root: None,
        }
    }

    /// The per-call timeout as a [`Duration`]. A negative, NaN or
    /// overflowing value is a configuration error, not a panic: the value
    /// comes from an external file or a public field.
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs).map_err(|_| {
            StoreError::Config(format!(
                "invalid timeout_secs {}: must be a finite, non-negative number of seconds",
                self.timeout_secs
            ))
        })
    }

    /// Load configuration from `{data_dir}/storage.json`, falling back to
    /// environment variables (`MIRRORSET_HOSTS` as a comma-separated list,
    /// `MIRRORSET_BASE_URL`) when the file is absent or unreadable.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let storage_json = data_dir.join("storage.json");

        if storage_json.exists() {
            match std::fs::read_to_string(&storage_json) {
                Ok(content) => match serde_json::from_str::<StorageConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded storage config: hosts={}, base_url={}",
                            config.hosts.len(),
                            config.base_url
                        );
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse storage.json: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read storage.json: {}, using defaults", e);
                }
            }
        }

        let hosts: Vec<Host> = std::env::var("MIRRORSET_HOSTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(Host::from)
                    .collect()
            })
            .unwrap_or_default();

        let base_url =
            std::env::var("MIRRORSET_BASE_URL").unwrap_or_else(|_| "http://localhost/".to_string());

        tracing::info!(
            "No storage.json found, using environment: hosts={}",
            hosts.len()
        );

        StorageConfig {
            hosts,
            base_url,
            timeout_secs: default_timeout_secs(),
            local_root: None,
        }
    }
}
