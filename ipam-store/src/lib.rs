//! ipam-store - Versioned Prefix Storage
//!
//! TigerStyle persistence layer for an IP address management system.
//!
//! Prefix records are keyed by `(cidr, namespace)` and guarded by a version
//! counter: concurrent updates of the same record are detected with
//! optimistic locking instead of being lost.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Allocation engine               │
//! ├─────────────────────────────────────────────┤
//! │  StorageBackend         │ create/read/CAS   │
//! │  MemoryBackend          │ RwLock<HashMap>   │
//! │  PostgresBackend        │ JSONB + FOR UPDATE│
//! ├─────────────────────────────────────────────┤
//! │  DST helpers            │ seeded op streams │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ipam_store::{MemoryBackend, Prefix, RequestContext, StorageBackend};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryBackend::new();
//! let cx = RequestContext::background();
//!
//! let created = store.create_prefix(&cx, Prefix::new("10.0.0.0/8")).await?;
//! let updated = store.update_prefix(&cx, created.clone()).await?;
//! assert_eq!(updated.version, 1);
//!
//! // A second update conditioned on the old version is rejected.
//! let err = store.update_prefix(&cx, created).await.unwrap_err();
//! assert!(err.is_conflict());
//! # Ok::<(), ipam_store::StorageError>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod dst;
pub mod storage;

// Re-export common types
pub use constants::*;
pub use dst::{apply, DeterministicRng, OpGenerator, OpOutcome, PrefixOp};
pub use storage::{
    ErrorKind, MemoryBackend, PostgresConfig, Prefix, PrefixKey, RequestContext, SslMode,
    StorageBackend, StorageError, StorageResult,
};

#[cfg(feature = "postgres")]
pub use storage::PostgresBackend;
