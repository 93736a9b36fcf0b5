use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::config::Host;
use crate::error::Result;

/// Which write a pending retry replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOperation {
    Create,
    Delete,
}

impl fmt::Display for RetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOperation::Create => f.write_str("create"),
            RetryOperation::Delete => f.write_str("delete"),
        }
    }
}

/// One pending replication for a single (operation, file name, target host).
///
/// `source_host` is a host where the operation already succeeded, so a replay
/// worker has an authoritative copy to replicate from. An entry is only ever
/// created when at least one host took the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEntry {
    pub id: u64,
    pub operation: RetryOperation,
    pub filename: String,
    pub target_host: Host,
    pub source_host: Host,
}

/// Pluggable persistence for pending retries.
///
/// The replicator only calls `create`; a replay worker owns `all`, `delete`
/// and `filter_by_filename`, and may pick its own order and backoff policy.
pub trait RetryQueue: Send + Sync {
    /// Number of pending entries.
    fn count(&self) -> usize;

    /// Every pending entry, in no significant order.
    fn all(&self) -> Vec<RetryEntry>;

    /// Persist one new pending entry.
    fn create(
        &self,
        operation: RetryOperation,
        target_host: &Host,
        source_host: &Host,
        filename: &str,
    ) -> Result<RetryEntry>;

    /// Remove an entry. Removing an entry that is already gone is not an
    /// error.
    fn delete(&self, entry: &RetryEntry) -> Result<()>;

    /// All pending entries for one file name, so that a later delete or
    /// overwrite of that name can void now-obsolete retries.
    fn filter_by_filename(&self, filename: &str) -> Vec<RetryEntry>;
}

/// In-memory reference adapter. Persistent adapters (a database table, a
/// journal file) implement the same trait.
#[derive(Default)]
pub struct MemoryRetryQueue {
    entries: DashMap<u64, RetryEntry>,
    next_id: AtomicU64,
}

impl MemoryRetryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetryQueue for MemoryRetryQueue {
    fn count(&self) -> usize {
        self.entries.len()
    }

    fn all(&self) -> Vec<RetryEntry> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    fn create(
        &self,
        operation: RetryOperation,
        target_host: &Host,
        source_host: &Host,
        filename: &str,
    ) -> Result<RetryEntry> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = RetryEntry {
            id,
            operation,
            filename: filename.to_string(),
            target_host: target_host.clone(),
            source_host: source_host.clone(),
        };
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    fn delete(&self, entry: &RetryEntry) -> Result<()> {
        self.entries.remove(&entry.id);
        Ok(())
    }

    fn filter_by_filename(&self, filename: &str) -> Vec<RetryEntry> {
        self.entries
            .iter()
            .filter(|e| e.value().filename == filename)
            .map(|e| e.value().clone())
            .collect()
    }
}
