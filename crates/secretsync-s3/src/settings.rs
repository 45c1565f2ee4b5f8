//! Connection settings for the S3 blob store

use secretsync_core::{ConfigError, DEFAULT_BACKUP_ROOT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where backups are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    /// Bucket name (required)
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, Wasabi, ...)
    pub endpoint: Option<String>,
    /// Key prefix under which `{namespace}/{name}.json` blobs live
    pub backup_root: String,
    /// Static credentials; the ambient AWS chain is used when absent
    pub credentials: Option<S3Credentials>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            backup_root: DEFAULT_BACKUP_ROOT.to_string(),
            credentials: None,
        }
    }
}

impl S3Settings {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_backup_root(mut self, root: impl Into<String>) -> Self {
        self.backup_root = root.into();
        self
    }

    pub fn with_credentials(mut self, credentials: S3Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Check required values and normalize the rest
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.bucket = self.bucket.trim().to_string();
        if self.bucket.is_empty() {
            return Err(ConfigError::missing("S3_BUCKET_NAME"));
        }
        if self.region.trim().is_empty() {
            self.region = DEFAULT_REGION.to_string();
        }
        self.endpoint = self
            .endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.backup_root = self.backup_root.trim_end_matches('/').to_string();
        if self.backup_root.is_empty() {
            return Err(ConfigError::EmptyBackupRoot);
        }
        Ok(self)
    }
}

/// Static access key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Build credentials from an optional pair
    ///
    /// Both absent means "use the ambient chain"; only one present is an error.
    pub fn from_pair(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (non_empty(access_key_id), non_empty(secret_access_key)) {
            (Some(id), Some(secret)) => Ok(Some(Self::new(id, secret))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::invalid(
                "S3_SECRET_ACCESS_KEY",
                "required when S3_ACCESS_KEY_ID is set",
            )),
            (None, Some(_)) => Err(ConfigError::invalid(
                "S3_ACCESS_KEY_ID",
                "required when S3_SECRET_ACCESS_KEY is set",
            )),
        }
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = S3Settings::new("backups");
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.backup_root, "k8s-secrets-backup");
        assert!(settings.endpoint.is_none());
        assert!(settings.credentials.is_none());
    }

    #[test]
    fn test_validate_requires_bucket() {
        assert_eq!(
            S3Settings::new("  ").validate(),
            Err(ConfigError::missing("S3_BUCKET_NAME"))
        );
    }

    #[test]
    fn test_validate_normalizes() {
        let settings = S3Settings::new("backups")
            .with_region("")
            .with_endpoint(" ")
            .with_backup_root("team/secrets/")
            .validate()
            .unwrap();

        assert_eq!(settings.region, DEFAULT_REGION);
        assert!(settings.endpoint.is_none());
        assert_eq!(settings.backup_root, "team/secrets");
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        assert_eq!(
            S3Settings::new("backups").with_backup_root("/").validate(),
            Err(ConfigError::EmptyBackupRoot)
        );
    }

    #[test]
    fn test_credentials_pair() {
        assert_eq!(S3Credentials::from_pair(None, None), Ok(None));
        assert_eq!(
            S3Credentials::from_pair(Some("id".into()), Some("secret".into())),
            Ok(Some(S3Credentials::new("id", "secret")))
        );
        assert!(S3Credentials::from_pair(Some("id".into()), None).is_err());
        assert!(S3Credentials::from_pair(Some("".into()), Some("secret".into())).is_err());
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let rendered = format!("{:?}", S3Credentials::new("AKIA123", "topsecret"));
        assert!(rendered.contains("AKIA123"));
        assert!(!rendered.contains("topsecret"));
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let settings: S3Settings =
            serde_yaml_ng::from_str("bucket: backups\nendpoint: http://minio:9000\n").unwrap();
        assert_eq!(settings.bucket, "backups");
        assert_eq!(settings.endpoint.as_deref(), Some("http://minio:9000"));
        assert_eq!(settings.region, DEFAULT_REGION);
    }
}
