//! Resource source that shells out to kubectl

use crate::manifest::{SecretList, SecretObject};
use crate::settings::KubeSettings;
use async_trait::async_trait;
use secretsync_core::{ResourceRecord, ResourceSource, SourceError};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// stderr fragments meaning the API server cannot be used at all
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Unable to connect to the server",
    "connection refused",
    "no such host",
    "i/o timeout",
    "Unauthorized",
    "(Forbidden)",
    "the server has asked for the client to provide credentials",
    "current-context is not set",
    "no configuration has been provided",
    "context was not found",
];

/// Cluster secrets through `kubectl`
#[derive(Debug, Clone)]
pub struct KubectlSource {
    kubectl: PathBuf,
    context: Option<String>,
}

impl KubectlSource {
    /// Resolve the kubectl binary; fails when it is not installed
    pub fn new(settings: &KubeSettings) -> Result<Self, SourceError> {
        let kubectl = which::which(&settings.kubectl).map_err(|e| {
            SourceError::Unavailable(format!("{} not found: {}", settings.kubectl, e))
        })?;
        debug!("Using kubectl at {}", kubectl.display());

        Ok(Self {
            kubectl,
            context: settings.context.clone(),
        })
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Leading arguments shared by every call
    fn base_args(&self, namespace: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args.push("--namespace".to_string());
        args.push(namespace.to_string());
        args
    }

    /// Run kubectl and return stdout, or the classified failure
    async fn run(
        &self,
        operation: &str,
        namespace: &str,
        args: &[&str],
        stdin: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SourceError> {
        let mut full_args = self.base_args(namespace);
        full_args.extend(args.iter().map(|a| a.to_string()));
        debug!("Running: kubectl {}", full_args.join(" "));

        let mut child = Command::new(&self.kubectl)
            .args(&full_args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SourceError::Unavailable(format!("failed to run kubectl: {}", e)))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(&input)
                .await
                .map_err(|e| SourceError::command(operation, e.to_string()))?;
            pipe.flush()
                .await
                .map_err(|e| SourceError::command(operation, e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SourceError::command(operation, e.to_string()))?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(operation, namespace, args, stderr.trim()))
    }

    async fn write(
        &self,
        verb: &str,
        namespace: &str,
        record: &ResourceRecord,
    ) -> Result<(), SourceError> {
        let manifest = serde_json::to_vec(&SecretObject::from_record(namespace, record))
            .map_err(|e| SourceError::command(verb, e.to_string()))?;
        self.run(verb, namespace, &[verb, "-f", "-"], Some(manifest))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceSource for KubectlSource {
    async fn list(&self, namespace: &str) -> Result<Vec<ResourceRecord>, SourceError> {
        let stdout = self
            .run("list", namespace, &["get", "secrets", "-o", "json"], None)
            .await?;
        let list: SecretList =
            serde_json::from_slice(&stdout).map_err(|e| SourceError::InvalidResponse {
                operation: "list".to_string(),
                message: e.to_string(),
            })?;

        let records = list.into_records(namespace);

        debug!("Listed {} secrets in {}", records.len(), namespace);
        Ok(records)
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ResourceRecord>, SourceError> {
        let stdout = match self
            .run("get", namespace, &["get", "secret", name, "-o", "json"], None)
            .await
        {
            Ok(stdout) => stdout,
            Err(SourceError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let object: SecretObject =
            serde_json::from_slice(&stdout).map_err(|e| SourceError::InvalidResponse {
                operation: "get".to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(object.into_record(namespace)))
    }

    async fn create(&self, namespace: &str, record: &ResourceRecord) -> Result<(), SourceError> {
        self.write("create", namespace, record).await
    }

    async fn replace(&self, namespace: &str, record: &ResourceRecord) -> Result<(), SourceError> {
        self.write("replace", namespace, record).await
    }

    fn name(&self) -> &'static str {
        "kubectl"
    }
}

/// Map kubectl's stderr onto a source error
///
/// `args` is the verb plus its operands; the secret name, when present, is
/// the first operand after the resource type or the one named in the manifest.
fn classify_failure(
    operation: &str,
    namespace: &str,
    args: &[&str],
    stderr: &str,
) -> SourceError {
    let name = secret_name_in(stderr)
        .or_else(|| args.get(2).copied().filter(|a| !a.starts_with('-')))
        .unwrap_or_default();

    if stderr.contains("(NotFound)") {
        SourceError::not_found(namespace, name)
    } else if stderr.contains("(AlreadyExists)") {
        SourceError::already_exists(namespace, name)
    } else if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
        SourceError::Unavailable(stderr.to_string())
    } else {
        SourceError::command(operation, stderr)
    }
}

/// `secrets "db-cred" not found` -> `db-cred`
fn secret_name_in(stderr: &str) -> Option<&str> {
    let rest = &stderr[stderr.find("secrets \"")? + "secrets \"".len()..];
    rest.split('"').next().filter(|n| !n.is_empty())
}
