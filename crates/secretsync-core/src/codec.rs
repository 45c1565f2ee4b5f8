//! Stored blob codec
//!
//! A record is stored as pretty-printed JSON with a fixed field order:
//!
//! ```text
//! {
//!   "metadata": { "name", "namespace", "labels", "annotations" },
//!   "type": "...",
//!   "data": { ... }
//! }
//! ```
//!
//! Maps are emitted in key order and nothing time-dependent is written, so the
//! same record always encodes to the same bytes. Empty `labels` and
//! `annotations` are written as `null`, matching blobs already in the bucket
//! from earlier backup tooling.

use crate::error::CodecError;
use crate::record::{ResourceRecord, DEFAULT_SECRET_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
struct StoredSecret<'a> {
    metadata: StoredMetadata<'a>,
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct StoredMetadata<'a> {
    name: &'a str,
    namespace: &'a str,
    labels: Option<&'a BTreeMap<String, String>>,
    annotations: Option<&'a BTreeMap<String, String>>,
}

// Unknown fields are ignored and nulls read as absent.
#[derive(Deserialize)]
struct LoadedSecret {
    metadata: Option<LoadedMetadata>,
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct LoadedMetadata {
    name: Option<String>,
    namespace: Option<String>,
    labels: Option<BTreeMap<String, String>>,
    annotations: Option<BTreeMap<String, String>>,
}

/// Serialize a record to its canonical stored form
pub fn encode(record: &ResourceRecord) -> Result<Vec<u8>, CodecError> {
    let stored = StoredSecret {
        metadata: StoredMetadata {
            name: &record.name,
            namespace: &record.namespace,
            labels: non_empty(&record.labels),
            annotations: non_empty(&record.annotations),
        },
        kind: &record.kind,
        data: &record.data,
    };

    serde_json::to_vec_pretty(&stored).map_err(|e| CodecError::Encode {
        namespace: record.namespace.clone(),
        name: record.name.clone(),
        reason: e.to_string(),
    })
}

/// Rebuild a record from stored bytes
///
/// Missing `labels`, `annotations` and `data` read as empty, a missing `type`
/// reads as `Opaque`. A missing or empty `metadata.name` or
/// `metadata.namespace` is malformed.
pub fn decode(bytes: &[u8]) -> Result<ResourceRecord, CodecError> {
    let loaded: LoadedSecret =
        serde_json::from_slice(bytes).map_err(|e| CodecError::malformed(e.to_string()))?;

    let metadata = loaded
        .metadata
        .ok_or_else(|| CodecError::malformed("missing field `metadata`"))?;

    let name = required(metadata.name, "metadata.name")?;
    let namespace = required(metadata.namespace, "metadata.namespace")?;

    Ok(ResourceRecord {
        namespace,
        name,
        kind: loaded
            .kind
            .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string()),
        labels: metadata.labels.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
        data: loaded.data.unwrap_or_default(),
    })
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<&BTreeMap<String, String>> {
    (!map.is_empty()).then_some(map)
}

fn required(value: Option<String>, field: &str) -> Result<String, CodecError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(CodecError::malformed(format!("field `{}` is empty", field))),
        None => Err(CodecError::malformed(format!("missing field `{}`", field))),
    }
}
