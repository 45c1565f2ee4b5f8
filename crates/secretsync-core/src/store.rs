//! Blob store capability

use crate::error::StoreError;
use async_trait::async_trait;

/// Key/value object storage addressed by `(namespace, name)` under a root prefix.
///
/// Implementations derive keys with [`BlobKey`](crate::key::BlobKey) and hold
/// no state between calls beyond their connection handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob exists for the record
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StoreError>;

    /// Fetch a blob
    ///
    /// Returns Ok(None) when there is no blob; that is the normal "no prior
    /// backup" outcome, not an error.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a blob, replacing any previous content
    async fn put(&self, namespace: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Full keys under the namespace prefix
    async fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError>;

    /// Root prefix the keys live under
    fn backup_root(&self) -> &str;

    /// Store name for logs
    fn name(&self) -> &'static str;
}
