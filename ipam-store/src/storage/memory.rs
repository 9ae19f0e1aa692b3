//! MemoryBackend - Process-local storage
//!
//! TigerStyle: One owned map behind one reader/writer lock.
//!
//! Readers share the lock; every mutation, including the bulk reset, takes it
//! exclusively. The version check in `update_prefix` happens under the write
//! lock, so check-and-increment is atomic. Records cross the lock boundary
//! only as clones.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::StorageBackend;
use super::context::RequestContext;
use super::error::{StorageError, StorageResult};
use super::prefix::{validate_namespace, Prefix, PrefixKey};

/// In-memory storage backend.
///
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    prefixes: Arc<RwLock<HashMap<PrefixKey, Prefix>>>,
}

impl MemoryBackend {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.prefixes.read().await.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.prefixes.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix> {
        cx.check()?;
        let prefix = prefix.normalized().with_version(0);
        prefix.validate()?;
        let key = prefix.key();

        let mut prefixes = self.prefixes.write().await;
        if prefixes.contains_key(&key) {
            return Err(StorageError::already_exists(key));
        }
        prefixes.insert(key, prefix.clone());

        tracing::debug!(cidr = %prefix.cidr, namespace = %prefix.namespace, "created prefix");
        Ok(prefix)
    }

    async fn read_prefix(
        &self,
        cx: &RequestContext,
        cidr: &str,
        namespace: &str,
    ) -> StorageResult<Prefix> {
        cx.check()?;
        let key = PrefixKey::new(cidr, namespace);
        key.validate()?;

        let prefixes = self.prefixes.read().await;
        prefixes
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn read_prefixes(
        &self,
        cx: &RequestContext,
        namespace: &str,
    ) -> StorageResult<Vec<Prefix>> {
        cx.check()?;
        if namespace.is_empty() {
            return Ok(Vec::new());
        }
        validate_namespace(namespace)?;

        let prefixes = self.prefixes.read().await;
        Ok(prefixes
            .iter()
            .filter(|(key, _)| key.namespace == namespace)
            .map(|(_, prefix)| prefix.clone())
            .collect())
    }

    async fn read_all_prefixes(&self, cx: &RequestContext) -> StorageResult<Vec<Prefix>> {
        cx.check()?;
        let prefixes = self.prefixes.read().await;
        Ok(prefixes.values().cloned().collect())
    }

    async fn read_all_prefix_cidrs(
        &self,
        cx: &RequestContext,
        namespace: &str,
    ) -> StorageResult<Vec<String>> {
        cx.check()?;
        if namespace.is_empty() {
            return Ok(Vec::new());
        }
        validate_namespace(namespace)?;

        let prefixes = self.prefixes.read().await;
        Ok(prefixes
            .keys()
            .filter(|key| key.namespace == namespace)
            .map(|key| key.cidr.clone())
            .collect())
    }

    async fn update_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix> {
        cx.check()?;
        let prefix = prefix.normalized();
        let key = prefix.key();
        if prefix.cidr.is_empty() {
            return Err(StorageError::not_found(key));
        }
        prefix.validate()?;

        let mut prefixes = self.prefixes.write().await;
        let stored = prefixes
            .get_mut(&key)
            .ok_or_else(|| StorageError::not_found(key.clone()))?;
        if stored.version != prefix.version {
            return Err(StorageError::conflict(key, prefix.version, stored.version));
        }

        let updated = prefix.with_version(stored.version + 1);
        *stored = updated.clone();

        tracing::debug!(
            cidr = %updated.cidr,
            namespace = %updated.namespace,
            version = updated.version,
            "updated prefix"
        );
        Ok(updated)
    }

    async fn delete_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix> {
        cx.check()?;
        let key = prefix.key();
        key.validate()?;
        let removed = self.prefixes.write().await.remove(&key);

        tracing::debug!(
            cidr = %prefix.cidr,
            namespace = %prefix.namespace,
            existed = removed.is_some(),
            "deleted prefix"
        );
        Ok(prefix)
    }

    async fn delete_all_prefixes(&self, cx: &RequestContext) -> StorageResult<()> {
        cx.check()?;
        let mut prefixes = self.prefixes.write().await;
        let count = prefixes.len();
        prefixes.clear();

        tracing::debug!(count, "deleted all prefixes");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NAMESPACE_DEFAULT, PREFIX_KEY_BYTES_MAX};
    use crate::storage::ErrorKind;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn cx() -> RequestContext {
        RequestContext::background()
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let backend = MemoryBackend::new();
        let prefix = Prefix::new("10.0.0.0/8").with_payload(json!({"child_prefix_length": 16}));

        let created = assert_ok!(backend.create_prefix(&cx(), prefix.clone()).await);
        assert_eq!(created, prefix);

        let read = assert_ok!(backend.read_prefix(&cx(), "10.0.0.0/8", NAMESPACE_DEFAULT).await);
        assert_eq!(read, created);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_resets_version() {
        let backend = MemoryBackend::new();
        let created = backend
            .create_prefix(&cx(), Prefix::new("10.0.0.0/8").with_version(9))
            .await
            .unwrap();
        assert_eq!(created.version, 0);
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let backend = MemoryBackend::new();
        backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();

        let err = assert_err!(backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await);
        assert_eq!(
            err,
            StorageError::already_exists(PrefixKey::new("10.0.0.0/8", NAMESPACE_DEFAULT))
        );
    }

    #[tokio::test]
    async fn test_empty_namespace_is_default() {
        let backend = MemoryBackend::new();
        let created = backend
            .create_prefix(&cx(), Prefix::new("10.0.0.0/8").with_namespace(""))
            .await
            .unwrap();
        assert_eq!(created.namespace, NAMESPACE_DEFAULT);

        assert!(backend.read_prefix(&cx(), "10.0.0.0/8", "").await.is_ok());
        assert!(backend.read_prefixes(&cx(), "").await.unwrap().is_empty());
        assert!(backend.read_all_prefix_cidrs(&cx(), "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_increments_version() {
        let backend = MemoryBackend::new();
        let created = backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();

        let updated = backend
            .update_prefix(&cx(), created.with_payload(json!({"ips": ["10.0.0.1"]})))
            .await
            .unwrap();
        assert_eq!(updated.version, 1);

        let read = backend.read_prefix(&cx(), "10.0.0.0/8", NAMESPACE_DEFAULT).await.unwrap();
        assert_eq!(read, updated);
    }

    #[tokio::test]
    async fn test_update_stale_version() {
        let backend = MemoryBackend::new();
        let v0 = backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();
        backend.update_prefix(&cx(), v0.clone()).await.unwrap();

        let err = backend.update_prefix(&cx(), v0).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::conflict(PrefixKey::new("10.0.0.0/8", NAMESPACE_DEFAULT), 0, 1)
        );
    }

    #[tokio::test]
    async fn test_update_missing_and_empty_cidr() {
        let backend = MemoryBackend::new();

        let err = backend.update_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap_err();
        assert!(err.is_not_found());

        let err = backend.update_prefix(&cx(), Prefix::new("")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_returned_records_are_isolated() {
        let backend = MemoryBackend::new();
        let mut created = backend
            .create_prefix(&cx(), Prefix::new("10.0.0.0/8").with_payload(json!({"ips": []})))
            .await
            .unwrap();
        created.payload = json!({"ips": ["tampered"]});

        let mut read = backend.read_prefix(&cx(), "10.0.0.0/8", NAMESPACE_DEFAULT).await.unwrap();
        assert_eq!(read.payload, json!({"ips": []}));
        read.version = 42;

        let again = backend.read_prefix(&cx(), "10.0.0.0/8", NAMESPACE_DEFAULT).await.unwrap();
        assert_eq!(again.version, 0);
    }

    #[tokio::test]
    async fn test_delete_all_empties_store() {
        let backend = MemoryBackend::new();
        for ns in ["a", "b"] {
            backend
                .create_prefix(&cx(), Prefix::new("10.0.0.0/8").with_namespace(ns))
                .await
                .unwrap();
        }
        assert_eq!(backend.len().await, 2);

        backend.delete_all_prefixes(&cx()).await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();
        assert_eq!(other.len().await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_leaves_state_untouched() {
        let backend = MemoryBackend::new();
        let cancelled = RequestContext::background();
        cancelled.cancel();

        let err = backend
            .create_prefix(&cancelled, Prefix::new("10.0.0.0/8"))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Cancelled);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_unstorable_records_are_rejected() {
        let backend = MemoryBackend::new();
        let stored = backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();

        let err = assert_err!(
            backend
                .create_prefix(&cx(), Prefix::new("10.1.0.0/16").with_payload(json!("a\u{0}")))
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidPrefix);

        let err = assert_err!(
            backend
                .update_prefix(&cx(), stored.clone().with_payload(json!({"tag": "\u{0}"})))
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidPrefix);

        let long = "n".repeat(PREFIX_KEY_BYTES_MAX);
        let err = assert_err!(backend.read_prefix(&cx(), "10.0.0.0/8", &long).await);
        assert_eq!(err.kind(), ErrorKind::InvalidPrefix);

        let unchanged = assert_ok!(backend.read_prefix(&cx(), "10.0.0.0/8", NAMESPACE_DEFAULT).await);
        assert_eq!(unchanged, stored);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_single_winner() {
        let backend = MemoryBackend::new();
        let v0 = backend.create_prefix(&cx(), Prefix::new("10.0.0.0/8")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = backend.clone();
            let attempt = v0.clone().with_payload(json!({ "writer": i }));
            handles.push(tokio::spawn(async move {
                backend.update_prefix(&RequestContext::background(), attempt).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(updated) => {
                    winners += 1;
                    assert_eq!(updated.version, 1);
                }
                Err(e) => assert!(e.is_conflict()),
            }
        }
        assert_eq!(winners, 1);
    }
}
