//! Storage Errors
//!
//! TigerStyle: Domain errors are distinct variants, never strings to match on.

use super::prefix::PrefixKey;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Create on an existing key
    AlreadyExists,
    /// Missing key
    NotFound,
    /// Observed version does not match the stored one
    OptimisticLockConflict,
    /// Record or key the store cannot hold
    InvalidPrefix,
    /// Request context was cancelled
    Cancelled,
    /// Request context deadline passed
    DeadlineExceeded,
    /// Connectivity or query failure in the backing store
    Transport,
    /// Serialization, configuration or other internal failure
    Internal,
}

/// Errors returned by every storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A record with this identity already exists.
    #[error("prefix {key} already exists")]
    AlreadyExists {
        /// Identity of the existing record
        key: PrefixKey,
    },

    /// No record with this identity.
    #[error("prefix {key} not found")]
    NotFound {
        /// Identity that was looked up
        key: PrefixKey,
    },

    /// The caller's observed version is stale.
    #[error("unable to update prefix {key}: observed version {observed}, stored version {stored}")]
    OptimisticLockConflict {
        /// Identity of the contended record
        key: PrefixKey,
        /// Version the caller conditioned the update on
        observed: u64,
        /// Version currently stored
        stored: u64,
    },

    /// The record or key cannot be stored by every backend.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// The request context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The request context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Could not reach the backing store.
    #[error("connection error: {0}")]
    Connection(String),

    /// A read query failed.
    #[error("read error: {0}")]
    Read(String),

    /// A write query failed.
    #[error("write error: {0}")]
    Write(String),

    /// A stored document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid backend configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(key: PrefixKey) -> Self {
        Self::NotFound { key }
    }

    /// Create an already-exists error.
    #[must_use]
    pub fn already_exists(key: PrefixKey) -> Self {
        Self::AlreadyExists { key }
    }

    /// Create an optimistic lock conflict.
    #[must_use]
    pub fn conflict(key: PrefixKey, observed: u64, stored: u64) -> Self {
        Self::OptimisticLockConflict {
            key,
            observed,
            stored,
        }
    }

    /// Create an invalid-prefix error.
    #[must_use]
    pub fn invalid_prefix(msg: impl Into<String>) -> Self {
        Self::InvalidPrefix(msg.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a read error.
    #[must_use]
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Create a write error.
    #[must_use]
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OptimisticLockConflict { .. } => ErrorKind::OptimisticLockConflict,
            Self::InvalidPrefix(_) => ErrorKind::InvalidPrefix,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Connection(_) | Self::Read(_) | Self::Write(_) => ErrorKind::Transport,
            Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for [`StorageError::OptimisticLockConflict`]; the caller should re-read and retry.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::OptimisticLockConflict
    }

    /// True for [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
