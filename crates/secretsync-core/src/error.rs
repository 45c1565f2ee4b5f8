//! Error types for secretsync-core
//!
//! Each component owns its error enum. The engine decides which of them are
//! fatal to a run and which only degrade a single record.

use thiserror::Error;

/// A stored blob that cannot be turned back into a [`ResourceRecord`].
///
/// [`ResourceRecord`]: crate::record::ResourceRecord
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is not valid JSON or lacks a mandatory field
    #[error("Malformed record: {reason}")]
    Malformed { reason: String },

    /// Record could not be serialized
    #[error("Failed to encode record {namespace}/{name}: {reason}")]
    Encode {
        namespace: String,
        name: String,
        reason: String,
    },
}

impl CodecError {
    /// Create a malformed record error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Blob store failures. All of them abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A request against a specific key or prefix failed
    #[error("Blob store request failed for {key}: {message}")]
    Request { key: String, message: String },

    /// The store cannot be reached or rejected our credentials
    #[error("Blob store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create a request error for a key
    pub fn request(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Request {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Resource source failures.
///
/// `NotFound` and `AlreadyExists` are local races the engine resolves itself;
/// everything else aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Record vanished between read and write
    #[error("Secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// Record appeared between read and create
    #[error("Secret {namespace}/{name} already exists")]
    AlreadyExists { namespace: String, name: String },

    /// Cluster API call failed
    #[error("Cluster request '{operation}' failed: {message}")]
    Command { operation: String, message: String },

    /// Cluster API cannot be reached or rejected our credentials
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),

    /// Cluster returned something we could not parse
    #[error("Invalid response from cluster for '{operation}': {message}")]
    InvalidResponse { operation: String, message: String },
}

impl SourceError {
    /// Create a not found error
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an already exists error
    pub fn already_exists(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a command error
    pub fn command(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this is a create/replace race rather than a cluster failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AlreadyExists { .. })
    }
}

/// Invalid or missing configuration. Raised before any sync work begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No namespace left after trimming
    #[error("At least one namespace is required")]
    NoNamespaces,

    /// Namespace cannot be used as a key segment
    #[error("Invalid namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// Backup root prefix is empty
    #[error("Backup root prefix must not be empty")]
    EmptyBackupRoot,

    /// Concurrency of zero
    #[error("Concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// A required setting was not provided by any source
    #[error("Missing required setting: {name}")]
    MissingSetting { name: String },

    /// Two settings conflict with each other
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    /// Config file could not be read or parsed
    #[error("Failed to load config file {path}: {reason}")]
    File { path: String, reason: String },
}

impl ConfigError {
    /// Create a missing setting error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingSetting { name: name.into() }
    }

    /// Create an invalid setting error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A failure that stops the current Backup or Restore flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(SourceError::not_found("default", "db").is_conflict());
        assert!(SourceError::already_exists("default", "db").is_conflict());
        assert!(!SourceError::command("get", "boom").is_conflict());
        assert!(!SourceError::Unavailable("dial tcp".into()).is_conflict());
    }

    #[test]
    fn test_sync_error_is_transparent() {
        let err: SyncError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err.to_string(), "Blob store unavailable: connection refused");
    }
}
