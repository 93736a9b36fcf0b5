use std::sync::Arc;

use crate::config::{Host, StorageConfig};
use crate::error::{HostFailure, ReplicationError, Result, StoreError};
use crate::retry::{RetryOperation, RetryQueue};
use crate::select::{HostSelector, RandomSelector};
use crate::transport::HttpTransport;

/// One logical write, executed once per host.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Upload or overwrite content.
    Create(Vec<u8>),
    Delete,
}

impl WriteOp {
    fn retry_operation(&self) -> RetryOperation {
        match self {
            WriteOp::Create(_) => RetryOperation::Create,
            WriteOp::Delete => RetryOperation::Delete,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            WriteOp::Create(_) => "create",
            WriteOp::Delete => "delete",
        }
    }
}

/// Executes writes against the full host set concurrently and decides each
/// operation's overall result.
///
/// There is no coordinator and no consensus: every host is attempted, all
/// outcomes are collected, and only then is the decision made. Hosts that
/// failed at the network level while at least one other host took the write
/// get a retry entry queued; protocol-level failures abort the operation.
pub struct Replicator {
    hosts: Vec<Host>,
    transport: Arc<HttpTransport>,
    queue: Arc<dyn RetryQueue>,
    selector: Box<dyn HostSelector>,
}

impl Replicator {
    pub fn new(config: &StorageConfig, queue: Arc<dyn RetryQueue>) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(StoreError::Config(
                "at least one host must be configured".to_string(),
            ));
        }
        let transport = Arc::new(HttpTransport::new(&config.base_url, config.timeout()?)?);

        Ok(Self {
            hosts: config.hosts.clone(),
            transport,
            queue,
            selector: Box::new(RandomSelector),
        })
    }

    /// Replace the read-path host selection strategy.
    pub fn with_selector(mut self, selector: Box<dyn HostSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Execute one write against every host and decide the overall result.
    ///
    /// - every host succeeded, or the failures were all network-level with
    ///   at least one success: `Ok`, with one retry entry queued per failed
    ///   host, sourced from a host that took the write;
    /// - any protocol-level failure, or no host succeeded: an aggregate
    ///   error carrying every per-host cause. No retry entries are queued
    ///   when nothing succeeded, since there is no good copy to replay from.
    pub async fn execute(&self, op: WriteOp, name: &str) -> Result<()> {
        // One task per host; each owns exactly one result slot. The barrier
        // join below means no decision is made before every host has been
        // attempted, and a fatal answer from one host does not cancel the
        // in-flight requests to the others.
        let mut handles = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            let transport = Arc::clone(&self.transport);
            let host = host.clone();
            let op = op.clone();
            let name = name.to_string();
            handles.push(tokio::spawn(async move {
                match op {
                    WriteOp::Create(content) => {
                        transport.create(&host, &name, content).await.map(|_| ())
                    }
                    WriteOp::Delete => transport.delete(&host, &name).await.map(|_| ()),
                }
            }));
        }

        let mut succeeded: Vec<&Host> = Vec::new();
        let mut transient: Vec<(Host, StoreError)> = Vec::new();
        let mut fatal: Vec<(Host, StoreError)> = Vec::new();

        for (host, handle) in self.hosts.iter().zip(handles) {
            match handle.await {
                Ok(Ok(())) => {
                    tracing::debug!(%host, %name, op = op.verb(), "replicated");
                    succeeded.push(host);
                }
                Ok(Err(cause)) if cause.is_transient() => {
                    tracing::warn!(%host, %name, op = op.verb(), error = %cause,
                        "host unreachable, will queue retry");
                    transient.push((host.clone(), cause));
                }
                Ok(Err(cause)) => {
                    tracing::error!(%host, %name, op = op.verb(), error = %cause,
                        "host rejected operation");
                    fatal.push((host.clone(), cause));
                }
                Err(join_err) => {
                    fatal.push((host.clone(), StoreError::Internal(join_err.to_string())));
                }
            }
        }

        let source = match succeeded.first() {
            Some(source) => *source,
            None => {
                // Nothing to replay from; surface every cause instead
                let failures = transient
                    .into_iter()
                    .map(|(host, cause)| HostFailure {
                        host,
                        transient: true,
                        cause,
                    })
                    .chain(fatal.into_iter().map(|(host, cause)| HostFailure {
                        host,
                        transient: false,
                        cause,
                    }))
                    .collect();
                return Err(ReplicationError::new(failures).into());
            }
        };

        let mut failures: Vec<HostFailure> = fatal
            .into_iter()
            .map(|(host, cause)| HostFailure {
                host,
                transient: false,
                cause,
            })
            .collect();

        for (host, cause) in transient {
            match self
                .queue
                .create(op.retry_operation(), &host, source, name)
            {
                Ok(entry) => {
                    tracing::info!(target_host = %host, source_host = %source, %name,
                        id = entry.id, "queued retry");
                }
                Err(queue_err) => {
                    // The retry intent could not be made durable, so this
                    // host's failure is no longer recoverable.
                    tracing::error!(%host, %name, error = %queue_err, "failed to queue retry");
                    failures.push(HostFailure {
                        host,
                        transient: false,
                        cause: StoreError::Queue(format!(
                            "could not queue retry: {queue_err} (original failure: {cause})"
                        )),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReplicationError::new(failures).into())
        }
    }

    /// One arbitrarily chosen host for a read-path call.
    pub fn pick_host(&self) -> &Host {
        self.selector.pick(&self.hosts)
    }

    /// Fetch content from one arbitrarily chosen host.
    pub async fn read_one(&self, name: &str) -> Result<Vec<u8>> {
        self.transport.read(self.pick_host(), name).await
    }

    /// Existence probe against one arbitrarily chosen host.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.transport.exists(self.pick_host(), name).await
    }

    /// Size probe against one arbitrarily chosen host.
    pub async fn size(&self, name: &str) -> Result<u64> {
        self.transport.size(self.pick_host(), name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::MemoryRetryQueue;

    #[test]
    fn test_empty_host_set_rejected() {
        let config = StorageConfig::new(vec![], "http://unused/media/");
        let queue = Arc::new(MemoryRetryQueue::new());
        let err = Replicator::new(&config, queue);
        assert!(matches!(err, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_invalid_timeout_rejected_at_construction() {
        let mut config = StorageConfig::new(
            vec![crate::config::Host::from("media1:8080")],
            "http://unused/media/",
        );
        config.timeout_secs = -1.0;
        let queue = Arc::new(MemoryRetryQueue::new());
        let err = Replicator::new(&config, queue);
        assert!(matches!(err, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_write_op_retry_operation() {
        assert_eq!(
            WriteOp::Create(vec![1]).retry_operation(),
            RetryOperation::Create
        );
        assert_eq!(WriteOp::Delete.retry_operation(), RetryOperation::Delete);
    }
}
