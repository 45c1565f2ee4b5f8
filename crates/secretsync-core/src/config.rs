//! Engine configuration

use crate::error::ConfigError;
use crate::key::DEFAULT_BACKUP_ROOT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of records in flight at once
pub const DEFAULT_CONCURRENCY: usize = 8;

const MAX_NAMESPACE_LEN: usize = 63;

/// Sync direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Capture live secrets into the blob store
    #[default]
    Backup,
    /// Apply stored blobs to the cluster
    Restore,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Backup => "backup",
            SyncMode::Restore => "restore",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values the engine runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Namespaces to process, in order
    pub namespaces: Vec<String>,
    /// Key prefix for stored blobs
    #[serde(default = "default_backup_root")]
    pub backup_root: String,
    #[serde(default)]
    pub mode: SyncMode,
    /// Replace live secrets that already exist during restore
    #[serde(default)]
    pub force_overwrite: bool,
    /// Upper bound on records processed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_backup_root() -> String {
    DEFAULT_BACKUP_ROOT.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl SyncConfig {
    /// Backup configuration with defaults for everything but the namespaces
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            backup_root: default_backup_root(),
            mode: SyncMode::default(),
            force_overwrite: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_backup_root(mut self, root: impl Into<String>) -> Self {
        self.backup_root = root.into();
        self
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Normalize and check the configuration
    ///
    /// Namespaces are trimmed, empty entries dropped and duplicates removed
    /// keeping the first occurrence. The backup root loses trailing slashes.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let mut namespaces: Vec<String> = Vec::with_capacity(self.namespaces.len());
        for raw in &self.namespaces {
            let ns = raw.trim();
            if ns.is_empty() || namespaces.iter().any(|seen| seen == ns) {
                continue;
            }
            validate_namespace(ns)?;
            namespaces.push(ns.to_string());
        }
        if namespaces.is_empty() {
            return Err(ConfigError::NoNamespaces);
        }
        self.namespaces = namespaces;

        let root = self.backup_root.trim().trim_end_matches('/');
        if root.is_empty() {
            return Err(ConfigError::EmptyBackupRoot);
        }
        self.backup_root = root.to_string();

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }

        Ok(self)
    }
}

/// Parse a comma-separated namespace list, as given in `NAMESPACES`
pub fn parse_namespace_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(String::from)
        .collect()
}

// RFC 1123 label, which is what the API server enforces for namespaces.
fn validate_namespace(ns: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidNamespace {
        namespace: ns.to_string(),
        reason: reason.to_string(),
    };

    if ns.len() > MAX_NAMESPACE_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if !ns
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits and '-' are allowed",
        ));
    }
    if ns.starts_with('-') || ns.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::new(["default"]);
        assert_eq!(config.backup_root, "k8s-secrets-backup");
        assert_eq!(config.mode, SyncMode::Backup);
        assert!(!config.force_overwrite);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_validate_normalizes_namespaces() {
        let config = SyncConfig::new([" default", "", "kube-system ", "default"])
            .validate()
            .unwrap();
        assert_eq!(config.namespaces, vec!["default", "kube-system"]);
    }

    #[test]
    fn test_validate_rejects_empty_namespace_set() {
        let err = SyncConfig::new(["  ", ""]).validate().unwrap_err();
        assert_eq!(err, ConfigError::NoNamespaces);
        assert_eq!(
            SyncConfig::new(Vec::<String>::new()).validate().unwrap_err(),
            ConfigError::NoNamespaces
        );
    }

    #[test]
    fn test_validate_rejects_bad_namespace() {
        let too_long = "a".repeat(64);
        for bad in ["team/a", "Default", "-edge", "edge-", too_long.as_str()] {
            let err = SyncConfig::new([bad]).validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidNamespace { .. }),
                "expected {bad} to be rejected"
            );
        }
    }

    #[test]
    fn test_validate_backup_root() {
        let config = SyncConfig::new(["default"])
            .with_backup_root("backups/")
            .validate()
            .unwrap();
        assert_eq!(config.backup_root, "backups");

        let err = SyncConfig::new(["default"])
            .with_backup_root("/")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyBackupRoot);
    }

    #[test]
    fn test_validate_concurrency() {
        let err = SyncConfig::new(["default"])
            .with_concurrency(0)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidConcurrency(0));
    }

    #[test]
    fn test_parse_namespace_list() {
        assert_eq!(
            parse_namespace_list("default, apps ,,monitoring"),
            vec!["default", "apps", "monitoring"]
        );
        assert!(parse_namespace_list(" , ").is_empty());
    }

    #[test]
    fn test_sync_mode_serde() {
        assert_eq!(serde_json::to_string(&SyncMode::Restore).unwrap(), "\"restore\"");
        let mode: SyncMode = serde_json::from_str("\"backup\"").unwrap();
        assert_eq!(mode, SyncMode::Backup);
    }
}
