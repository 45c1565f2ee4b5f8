//! Resource source capability

use crate::error::SourceError;
use crate::record::ResourceRecord;
use async_trait::async_trait;

/// Live, namespaced secrets in a cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// All secrets in the namespace, minus service account tokens
    async fn list(&self, namespace: &str) -> Result<Vec<ResourceRecord>, SourceError>;

    /// Read one secret
    ///
    /// Returns Ok(None) if it does not exist.
    async fn get(&self, namespace: &str, name: &str)
        -> Result<Option<ResourceRecord>, SourceError>;

    /// Create a secret
    ///
    /// Fails with [`SourceError::AlreadyExists`] if one with that name exists.
    async fn create(&self, namespace: &str, record: &ResourceRecord) -> Result<(), SourceError>;

    /// Replace an existing secret wholesale
    ///
    /// Fails with [`SourceError::NotFound`] if there is nothing to replace.
    async fn replace(&self, namespace: &str, record: &ResourceRecord)
        -> Result<(), SourceError>;

    /// Source name for logs
    fn name(&self) -> &'static str;
}
