//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: Abstract storage, one contract, interchangeable backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryBackend  │           │ PostgresBackend │
//! │ (process-local) │           │  (production)   │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! # Optimistic Locking
//!
//! Every record carries a version. `update_prefix` succeeds only when the
//! caller's observed version equals the stored one, and stores the record at
//! version + 1. Of two updaters that observed the same version, exactly one
//! wins; the other gets `OptimisticLockConflict` and must re-read.

mod backend;
mod config;
mod context;
mod error;
mod memory;
mod prefix;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::StorageBackend;
pub use config::{PostgresConfig, SslMode};
pub use context::RequestContext;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use prefix::{validate_namespace, Prefix, PrefixKey};

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
