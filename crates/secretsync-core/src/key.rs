//! Blob key derivation
//!
//! A record lives at `{root}/{namespace}/{name}.json`.

use std::fmt;

/// Default key prefix for stored blobs
pub const DEFAULT_BACKUP_ROOT: &str = "k8s-secrets-backup";

const BLOB_SUFFIX: &str = ".json";

/// Location of one stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
    root: String,
    namespace: String,
    name: String,
}

impl BlobKey {
    /// Build the key for a record
    pub fn new(root: &str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: normalize_root(root).to_string(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Recover namespace and name from a full key listed under a namespace
    ///
    /// Returns `None` for anything that is not `{root}/{namespace}/{name}.json`
    /// with a non-empty, slash-free name.
    pub fn parse(root: &str, namespace: &str, key: &str) -> Option<Self> {
        let rest = key.strip_prefix(&namespace_prefix(root, namespace))?;
        let name = rest.strip_suffix(BLOB_SUFFIX)?;
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(root, namespace, name))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}{}",
            self.root, self.namespace, self.name, BLOB_SUFFIX
        )
    }
}

/// Listing prefix for one namespace, always ending in `/`
pub fn namespace_prefix(root: &str, namespace: &str) -> String {
    format!("{}/{}/", normalize_root(root), namespace)
}

fn normalize_root(root: &str) -> &str {
    root.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = BlobKey::new(DEFAULT_BACKUP_ROOT, "default", "db-cred");
        assert_eq!(key.to_string(), "k8s-secrets-backup/default/db-cred.json");
    }

    #[test]
    fn test_trailing_slash_on_root_is_ignored() {
        let key = BlobKey::new("backups/prod/", "default", "db-cred");
        assert_eq!(key.to_string(), "backups/prod/default/db-cred.json");
        assert_eq!(namespace_prefix("backups/prod/", "default"), "backups/prod/default/");
    }

    #[test]
    fn test_parse_recovers_identity() {
        let key = BlobKey::parse(
            DEFAULT_BACKUP_ROOT,
            "default",
            "k8s-secrets-backup/default/db-cred.json",
        )
        .unwrap();
        assert_eq!(key.namespace(), "default");
        assert_eq!(key.name(), "db-cred");
        assert_eq!(key, BlobKey::new(DEFAULT_BACKUP_ROOT, "default", "db-cred"));
    }

    #[test]
    fn test_parse_keeps_inner_dots() {
        let key = BlobKey::parse("root", "ns", "root/ns/tls.example.com.json").unwrap();
        assert_eq!(key.name(), "tls.example.com");
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert!(BlobKey::parse("root", "ns", "root/ns/readme.txt").is_none());
        assert!(BlobKey::parse("root", "ns", "root/ns/.json").is_none());
        assert!(BlobKey::parse("root", "ns", "root/ns/nested/a.json").is_none());
        assert!(BlobKey::parse("root", "ns", "root/other/a.json").is_none());
        assert!(BlobKey::parse("root", "ns", "root/nsx/a.json").is_none());
    }
}
