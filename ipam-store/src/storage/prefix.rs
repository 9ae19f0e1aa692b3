//! Prefix - The stored record
//!
//! TigerStyle: Explicit types, structured identity, builder-style setters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{NAMESPACE_DEFAULT, PREFIX_KEY_BYTES_MAX};

use super::error::{StorageError, StorageResult};

fn default_namespace() -> String {
    NAMESPACE_DEFAULT.to_string()
}

fn normalize_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        NAMESPACE_DEFAULT
    } else {
        namespace
    }
}

/// Reject text the relational backend cannot store (`text`/`jsonb` hold no NUL).
fn check_text(field: &str, value: &str) -> StorageResult<()> {
    if value.contains('\0') {
        return Err(StorageError::invalid_prefix(format!("{field} contains a NUL character")));
    }
    Ok(())
}

fn payload_contains_nul(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => s.contains('\0'),
        serde_json::Value::Array(items) => items.iter().any(payload_contains_nul),
        serde_json::Value::Object(fields) => fields
            .iter()
            .any(|(name, v)| name.contains('\0') || payload_contains_nul(v)),
        _ => false,
    }
}

/// Check a namespace used to filter scans.
///
/// # Errors
/// `InvalidPrefix` if it contains NUL or exceeds [`PREFIX_KEY_BYTES_MAX`].
pub fn validate_namespace(namespace: &str) -> StorageResult<()> {
    check_text("namespace", namespace)?;
    if namespace.len() > PREFIX_KEY_BYTES_MAX {
        return Err(StorageError::invalid_prefix(format!(
            "namespace is {} bytes, max {PREFIX_KEY_BYTES_MAX}",
            namespace.len()
        )));
    }
    Ok(())
}

// =============================================================================
// PrefixKey
// =============================================================================

/// Identity of a prefix record: `(cidr, namespace)`.
///
/// The two parts are kept separate rather than joined into one string, so no
/// two distinct keys can collide whatever characters a namespace holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixKey {
    /// Canonical textual block, e.g. `10.0.0.0/8`
    pub cidr: String,
    /// Logical partition
    pub namespace: String,
}

impl PrefixKey {
    /// Build a key. An empty namespace maps to [`NAMESPACE_DEFAULT`].
    #[must_use]
    pub fn new(cidr: impl Into<String>, namespace: &str) -> Self {
        Self {
            cidr: cidr.into(),
            namespace: normalize_namespace(namespace).to_string(),
        }
    }

    /// Check that every backend can store this key.
    ///
    /// # Errors
    /// `InvalidPrefix` if either part contains NUL or the key exceeds
    /// [`PREFIX_KEY_BYTES_MAX`].
    pub fn validate(&self) -> StorageResult<()> {
        check_text("cidr", &self.cidr)?;
        check_text("namespace", &self.namespace)?;

        let len = self.cidr.len() + self.namespace.len();
        if len > PREFIX_KEY_BYTES_MAX {
            return Err(StorageError::invalid_prefix(format!(
                "key is {len} bytes, max {PREFIX_KEY_BYTES_MAX}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in namespace {}", self.cidr, self.namespace)
    }
}

// =============================================================================
// Prefix
// =============================================================================

/// A network prefix together with its caller-owned allocation state.
///
/// `payload` is opaque to the store: it is copied and serialized, never read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    /// Canonical textual block
    pub cidr: String,
    /// Logical partition
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Version the record was stored (or last observed) at
    #[serde(default)]
    pub version: u64,
    /// Allocation state owned by the caller
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Prefix {
    /// Create a prefix in the default namespace with an empty payload.
    #[must_use]
    pub fn new(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            namespace: default_namespace(),
            version: 0,
            payload: serde_json::Value::Null,
        }
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the observed version.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Set the allocation payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Identity key of this record.
    #[must_use]
    pub fn key(&self) -> PrefixKey {
        PrefixKey::new(self.cidr.clone(), &self.namespace)
    }

    /// Check that every backend can store this record.
    ///
    /// The payload is only scanned for NUL characters, never interpreted.
    ///
    /// # Errors
    /// `InvalidPrefix` if the key is invalid or the payload contains NUL.
    pub fn validate(&self) -> StorageResult<()> {
        self.key().validate()?;
        if payload_contains_nul(&self.payload) {
            return Err(StorageError::invalid_prefix("payload contains a NUL character"));
        }
        Ok(())
    }

    /// Replace an empty namespace with the default one.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.namespace.is_empty() {
            self.namespace = default_namespace();
        }
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
