//! # Mirrorset
//!
//! Replicates file-like blobs across a fixed set of HTTP hosts so that one
//! logical write is durably mirrored to all of them, tolerating the
//! temporary unavailability of any subset. No coordinator, no consensus:
//! writes fan out to every host concurrently, network-level failures are
//! queued for later replay from a host that took the write, and
//! protocol-level failures abort the operation with every per-host cause
//! attached.
//!
//! Hosts are expected to implement GET, HEAD, PUT and DELETE per RFC 9110;
//! any plain HTTP file server with PUT/DELETE enabled works.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mirrorset::{DistributedStorage, Host, MemoryRetryQueue, StorageConfig};
//!
//! # async fn run() -> mirrorset::Result<()> {
//! let config = StorageConfig::new(
//!     vec![Host::from("media1:8080"), Host::from("media2:8080")],
//!     "http://media.example.com/media/",
//! );
//! let storage = DistributedStorage::new(config, Arc::new(MemoryRetryQueue::new()))?;
//!
//! storage.save("photos/a.txt", b"hi").await?;
//! assert_eq!(storage.size("photos/a.txt").await?, 2);
//! storage.delete("photos/a.txt").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Swap [`MemoryRetryQueue`] for any [`RetryQueue`] implementation to make
//! pending retries durable; a replay worker drains them with
//! [`RetryQueue::all`] and [`RetryQueue::delete`].

pub mod config;
pub mod error;
pub mod replicator;
pub mod retry;
pub mod select;
pub mod storage;
pub mod transport;

pub use config::{Host, StorageConfig};
pub use error::{HostFailure, ReplicationError, Result, StoreError};
pub use replicator::{Replicator, WriteOp};
pub use retry::{MemoryRetryQueue, RetryEntry, RetryOperation, RetryQueue};
pub use select::{FixedSelector, HostSelector, RandomSelector};
pub use storage::DistributedStorage;
