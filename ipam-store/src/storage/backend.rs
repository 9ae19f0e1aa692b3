//! StorageBackend - The prefix storage contract
//!
//! TigerStyle: One trait, interchangeable backends, identical observable
//! behavior.

use async_trait::async_trait;

use super::context::RequestContext;
use super::error::StorageResult;
use super::prefix::Prefix;

/// Storage contract implemented by every backend.
///
/// All records handed out are owned copies; nothing returned aliases stored
/// state. Domain errors (`AlreadyExists`, `NotFound`, `OptimisticLockConflict`)
/// are returned to the caller and never retried inside the backend.
///
/// Every operation also fails with `Cancelled` or `DeadlineExceeded` when the
/// request context ends first, and with a transport error when the backing
/// store cannot be reached.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend identifier.
    fn name(&self) -> &'static str;

    /// Store a new record at version 0.
    ///
    /// # Errors
    /// `AlreadyExists` if `(cidr, namespace)` is taken, `InvalidPrefix` if
    /// any field holds NUL or the key is too long.
    async fn create_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix>;

    /// Read one record.
    ///
    /// # Errors
    /// `NotFound` if the key has no record, `InvalidPrefix` if the key could
    /// never be stored.
    async fn read_prefix(
        &self,
        cx: &RequestContext,
        cidr: &str,
        namespace: &str,
    ) -> StorageResult<Prefix>;

    /// All records in `namespace`, in no particular order.
    ///
    /// An empty namespace matches nothing.
    ///
    /// # Errors
    /// `InvalidPrefix` if `namespace` holds NUL or is too long.
    async fn read_prefixes(&self, cx: &RequestContext, namespace: &str)
        -> StorageResult<Vec<Prefix>>;

    /// All records in every namespace.
    ///
    /// # Errors
    /// Only context and transport failures.
    async fn read_all_prefixes(&self, cx: &RequestContext) -> StorageResult<Vec<Prefix>>;

    /// Cidrs of all records in `namespace`.
    ///
    /// An empty namespace matches nothing.
    ///
    /// # Errors
    /// `InvalidPrefix` if `namespace` holds NUL or is too long.
    async fn read_all_prefix_cidrs(
        &self,
        cx: &RequestContext,
        namespace: &str,
    ) -> StorageResult<Vec<String>>;

    /// Compare-and-swap update.
    ///
    /// `prefix.version` is the version the caller last observed. On success
    /// the record is stored, and returned, at `prefix.version + 1`.
    ///
    /// # Errors
    /// `NotFound` if `cidr` is empty or the key has no record,
    /// `OptimisticLockConflict` if the stored version differs,
    /// `InvalidPrefix` as for `create_prefix`.
    async fn update_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix>;

    /// Remove a record if present. Returns the input either way.
    ///
    /// # Errors
    /// `InvalidPrefix` if the key could never be stored. A missing record
    /// is not an error.
    async fn delete_prefix(&self, cx: &RequestContext, prefix: Prefix) -> StorageResult<Prefix>;

    /// Remove every record in every namespace.
    ///
    /// # Errors
    /// Only context and transport failures.
    async fn delete_all_prefixes(&self, cx: &RequestContext) -> StorageResult<()>;
}
