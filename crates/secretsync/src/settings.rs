//! Settings resolution
//!
//! Flags and environment variables (both handled by clap) win over the YAML
//! config file, which wins over built-in defaults.

use crate::cli::SyncArgs;
use camino::Utf8Path;
use secretsync_core::{
    parse_namespace_list, ConfigError, SyncConfig, SyncMode, DEFAULT_BACKUP_ROOT,
    DEFAULT_CONCURRENCY,
};
use secretsync_kube::KubeSettings;
use secretsync_s3::{S3Credentials, S3Settings, DEFAULT_REGION};
use serde::Deserialize;

/// Optional YAML config file
///
/// ```yaml
/// namespaces: [default, payments]
/// backup_dir: k8s-secrets-backup
/// mode: restore
/// force_overwrite: false
/// concurrency: 8
/// s3:
///   bucket: cluster-backups
///   endpoint: http://minio:9000
///   region: us-east-1
/// kube:
///   context: prod
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub namespaces: Vec<String>,
    pub backup_dir: Option<String>,
    pub mode: Option<SyncMode>,
    pub force_overwrite: Option<bool>,
    pub concurrency: Option<usize>,
    pub s3: FileS3,
    pub kube: FileKube,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileS3 {
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileKube {
    pub context: Option<String>,
    pub kubectl: Option<String>,
}

/// Fully resolved and validated settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub sync: SyncConfig,
    pub s3: S3Settings,
    pub kube: KubeSettings,
}

/// Mode and overwrite choice made on the command line, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeChoice {
    pub mode: Option<SyncMode>,
    pub force_overwrite: Option<bool>,
}

impl FileConfig {
    /// Read a config file; no path means an empty config
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let file_error = |reason: String| ConfigError::File {
            path: path.to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(&content).map_err(|e| file_error(e.to_string()))
    }
}

/// Merge command-line values over the file and validate everything
pub fn resolve(
    args: &SyncArgs,
    choice: ModeChoice,
    file: FileConfig,
) -> Result<Settings, ConfigError> {
    let namespaces = match &args.namespaces {
        Some(list) => parse_namespace_list(list),
        None => file.namespaces,
    };

    let sync = SyncConfig::new(namespaces)
        .with_mode(choice.mode.or(file.mode).unwrap_or_default())
        .with_force_overwrite(choice.force_overwrite.or(file.force_overwrite).unwrap_or(false))
        .with_backup_root(
            pick(&args.backup_dir, file.backup_dir).unwrap_or_else(|| DEFAULT_BACKUP_ROOT.into()),
        )
        .with_concurrency(args.concurrency.or(file.concurrency).unwrap_or(DEFAULT_CONCURRENCY))
        .validate()?;

    let credentials = S3Credentials::from_pair(
        pick(&args.access_key_id, file.s3.access_key_id),
        pick(&args.secret_access_key, file.s3.secret_access_key),
    )?;

    let mut s3 = S3Settings::new(pick(&args.bucket, file.s3.bucket).unwrap_or_default())
        .with_region(pick(&args.region, file.s3.region).unwrap_or_else(|| DEFAULT_REGION.into()))
        .with_backup_root(sync.backup_root.clone());
    if let Some(endpoint) = pick(&args.endpoint, file.s3.endpoint) {
        s3 = s3.with_endpoint(endpoint);
    }
    if let Some(credentials) = credentials {
        s3 = s3.with_credentials(credentials);
    }
    let s3 = s3.validate()?;

    let mut kube = KubeSettings::default();
    if let Some(kubectl) = pick(&args.kubectl, file.kube.kubectl) {
        kube = kube.with_kubectl(kubectl);
    }
    if let Some(context) = pick(&args.context, file.kube.context) {
        kube = kube.with_context(context);
    }

    Ok(Settings { sync, s3, kube })
}

/// Command-line value if set and non-blank, else the file value
fn pick(arg: &Option<String>, file: Option<String>) -> Option<String> {
    arg.clone()
        .filter(|v| !v.trim().is_empty())
        .or(file)
        .filter(|v| !v.trim().is_empty())
}
