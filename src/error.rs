use std::fmt;

use thiserror::Error;

use crate::config::Host;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {status} for {method} {url}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retry queue error: {0}")]
    Queue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Whether this failure is a network-level one that a later retry can
    /// plausibly fix. Everything the transport interprets itself (unexpected
    /// status, missing length) signals protocol drift on that host and is
    /// fatal for the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Network(_))
    }
}

/// One host's failure within a fanned-out write.
#[derive(Debug)]
pub struct HostFailure {
    pub host: Host,
    pub transient: bool,
    pub cause: StoreError,
}

/// Raised when a fanned-out write cannot be reported as successful.
///
/// Carries the cause for every failed host, never just the first, so an
/// operator can tell broken hosts apart from merely unreachable ones.
#[derive(Debug)]
pub struct ReplicationError {
    pub failures: Vec<HostFailure>,
}

impl ReplicationError {
    pub fn new(failures: Vec<HostFailure>) -> Self {
        Self { failures }
    }
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Replication failed on {} host(s):", self.failures.len())?;
        for failure in &self.failures {
            let kind = if failure.transient {
                "transient"
            } else {
                "fatal"
            };
            write!(f, " [{} {}: {}]", failure.host, kind, failure.cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReplicationError {}
