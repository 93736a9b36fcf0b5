use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::replicator::{Replicator, WriteOp};
use crate::retry::RetryQueue;
use crate::select::HostSelector;

/// File storage mirrored across every configured host.
///
/// All multi-host mechanics live in the [`Replicator`]; this façade only
/// decides where each call goes. With a `local_root` configured the storage
/// runs in hybrid mode: reads are served from the local filesystem and
/// writes land there before being replicated. Without one, reads go to one
/// arbitrarily chosen host.
///
/// Two concurrent saves of the same name have no defined winner: different
/// hosts can end up with different final content. Callers that need unique
/// names must generate them before calling [`save`](Self::save).
pub struct DistributedStorage {
    replicator: Replicator,
    queue: Arc<dyn RetryQueue>,
    base: Url,
    local_root: Option<PathBuf>,
}

impl DistributedStorage {
    pub fn new(config: StorageConfig, queue: Arc<dyn RetryQueue>) -> Result<Self> {
        let replicator = Replicator::new(&config, Arc::clone(&queue))?;
        let base = Url::parse(&config.base_url).map_err(|e| {
            StoreError::Config(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        Ok(Self {
            replicator,
            queue,
            base,
            local_root: config.local_root,
        })
    }

    /// Replace the read-path host selection strategy.
    pub fn with_selector(mut self, selector: Box<dyn HostSelector>) -> Self {
        self.replicator = self.replicator.with_selector(selector);
        self
    }

    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        self.local_root.as_ref().map(|root| root.join(name))
    }

    /// Write content under `name` everywhere.
    pub async fn save(&self, name: &str, content: &[u8]) -> Result<()> {
        // Pending retries for this name would replay content this write
        // supersedes
        self.void_pending_retries(name);

        if let Some(path) = self.local_path(name) {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
        }

        self.replicator
            .execute(WriteOp::Create(content.to_vec()), name)
            .await
    }

    /// Fetch content for `name`, from the local mirror when configured,
    /// otherwise from one arbitrarily chosen host.
    pub async fn open(&self, name: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.local_path(name) {
            return match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(StoreError::NotFound(name.to_string()))
                }
                Err(e) => Err(e.into()),
            };
        }
        self.replicator.read_one(name).await
    }

    /// Remove `name` everywhere. A host that already reports the file absent
    /// counts as agreeing with the delete, not as failing it.
    pub async fn delete(&self, name: &str) -> Result<()> {
        // A pending replay of the old content is meaningless once the name
        // is deleted
        self.void_pending_retries(name);

        if let Some(path) = self.local_path(name) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.replicator.execute(WriteOp::Delete, name).await
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        if let Some(path) = self.local_path(name) {
            return Ok(tokio::fs::try_exists(&path).await?);
        }
        self.replicator.exists(name).await
    }

    pub async fn size(&self, name: &str) -> Result<u64> {
        if let Some(path) = self.local_path(name) {
            return match tokio::fs::metadata(&path).await {
                Ok(meta) => Ok(meta.len()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(StoreError::NotFound(name.to_string()))
                }
                Err(e) => Err(e.into()),
            };
        }
        self.replicator.size(name).await
    }

    /// Public URL for `name`, joined onto the configured base URL. Each
    /// path segment is percent-encoded, so names with spaces or characters
    /// like `#` stay intact.
    pub fn url(&self, name: &str) -> String {
        let mut url = self.base.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().extend(name.split('/'));
            }
            Err(()) => return format!("{}{}", self.base, name),
        }
        url.to_string()
    }

    fn void_pending_retries(&self, name: &str) {
        for entry in self.queue.filter_by_filename(name) {
            match self.queue.delete(&entry) {
                Ok(()) => {
                    tracing::info!(%name, id = entry.id, target_host = %entry.target_host,
                        "dropped obsolete retry");
                }
                Err(e) => {
                    tracing::warn!(%name, id = entry.id, error = %e,
                        "failed to drop obsolete retry");
                }
            }
        }
    }
}
