//! Secret objects as kubectl reads and writes them

use secretsync_core::{ResourceRecord, DEFAULT_SECRET_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// `kubectl get secrets -o json`
#[derive(Debug, Deserialize)]
pub struct SecretList {
    #[serde(default)]
    pub items: Vec<SecretObject>,
}

/// A core/v1 Secret, reduced to the fields we carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretObject {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "secret_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl SecretList {
    /// Records worth syncing: nameless items and service account tokens
    /// are dropped
    pub fn into_records(self, namespace: &str) -> Vec<ResourceRecord> {
        self.items
            .into_iter()
            .filter_map(|item| {
                if item.metadata.name.is_empty() {
                    warn!("Ignoring secret without a name in namespace {}", namespace);
                    return None;
                }
                let record = item.into_record(namespace);
                if record.is_service_account_token() {
                    debug!("Ignoring service account token: {}", record.qualified_name());
                    return None;
                }
                Some(record)
            })
            .collect()
    }
}

fn api_version() -> String {
    "v1".to_string()
}

fn secret_kind() -> String {
    "Secret".to_string()
}

impl SecretObject {
    /// Manifest for `create -f -` / `replace -f -` in the given namespace
    pub fn from_record(namespace: &str, record: &ResourceRecord) -> Self {
        let non_empty = |map: &BTreeMap<String, String>| (!map.is_empty()).then(|| map.clone());
        Self {
            api_version: api_version(),
            kind: secret_kind(),
            metadata: ObjectMeta {
                name: record.name.clone(),
                namespace: Some(namespace.to_string()),
                labels: non_empty(&record.labels),
                annotations: non_empty(&record.annotations),
            },
            secret_type: Some(record.kind.clone()),
            data: Some(record.data.clone()),
        }
    }

    /// Convert into a record, falling back to `namespace` when the object
    /// omits its own
    pub fn into_record(self, namespace: &str) -> ResourceRecord {
        ResourceRecord {
            namespace: self
                .metadata
                .namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| namespace.to_string()),
            name: self.metadata.name,
            kind: self
                .secret_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string()),
            labels: self.metadata.labels.unwrap_or_default(),
            annotations: self.metadata.annotations.unwrap_or_default(),
            data: self.data.unwrap_or_default(),
        }
    }
}
