//! Resource record model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Secret type the cluster manages itself; never captured or restored
pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";

/// Secret type applied when a stored blob carries none
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// One namespaced secret.
///
/// Maps are ordered so that the encoded form is byte-stable. `data` values are
/// the cluster's base64 payloads and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ResourceRecord {
    /// Create an `Opaque` record with no metadata and no data
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: DEFAULT_SECRET_TYPE.to_string(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// Set the secret type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Add a data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Whether the cluster regenerates this record on its own
    pub fn is_service_account_token(&self) -> bool {
        self.kind == SERVICE_ACCOUNT_TOKEN_TYPE
    }

    /// `namespace/name`, for logs and reports
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}
