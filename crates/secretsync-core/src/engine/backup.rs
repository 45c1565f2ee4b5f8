//! Backup flow: live secrets -> blob store

use super::{RunState, SyncEngine};
use crate::codec;
use crate::config::SyncMode;
use crate::error::SyncError;
use crate::fingerprint::Fingerprint;
use crate::key::BlobKey;
use crate::record::ResourceRecord;
use crate::report::{RecordOutcome, SyncDecision, SyncReport};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

impl SyncEngine {
    /// Capture every live secret whose content differs from its stored blob
    ///
    /// Only changed or new records are written, so a second run against an
    /// unchanged cluster issues no writes.
    pub async fn backup(&self) -> SyncReport {
        let started = Instant::now();
        let state = RunState::new(self.config.concurrency);

        let per_namespace: Vec<Vec<RecordOutcome>> = stream::iter(self.config.namespaces.iter())
            .map(|namespace| self.backup_namespace(namespace, &state))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        let outcomes = per_namespace.into_iter().flatten().collect();
        SyncReport::new(SyncMode::Backup, outcomes, state.into_fatal())
            .with_elapsed(started.elapsed())
    }

    async fn backup_namespace(&self, namespace: &str, state: &RunState) -> Vec<RecordOutcome> {
        if state.is_aborted() {
            return Vec::new();
        }
        info!("Backing up secrets in namespace: {}", namespace);

        let records = match self.source.list(namespace).await {
            Ok(records) => records,
            Err(e) => {
                state.abort(e.into());
                return Vec::new();
            }
        };

        let records: Vec<ResourceRecord> = records
            .into_iter()
            .filter(|record| {
                if record.is_service_account_token() {
                    debug!("Ignoring service account token: {}", record.qualified_name());
                    false
                } else {
                    true
                }
            })
            .collect();
        let live: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();

        let mut outcomes: Vec<RecordOutcome> = stream::iter(records)
            .map(|record| {
                let name = record.name.clone();
                state.guarded(namespace, name, self.backup_record(namespace, record))
            })
            .buffer_unordered(self.config.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        if !state.is_aborted() {
            match self.orphaned_blobs(namespace, &live).await {
                Ok(orphans) => outcomes.extend(orphans),
                Err(e) => state.abort(e),
            }
        }

        outcomes
    }

    /// Encode, compare against the stored fingerprint, write on change
    async fn backup_record(
        &self,
        namespace: &str,
        record: ResourceRecord,
    ) -> Result<RecordOutcome, SyncError> {
        let name = record.name.clone();

        let bytes = match codec::encode(&record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot encode {}/{}: {}", namespace, name, e);
                return Ok(RecordOutcome::new(
                    namespace,
                    name,
                    SyncDecision::Failed(e.to_string()),
                ));
            }
        };
        let current = Fingerprint::of(&bytes);

        let decision = match self.store.get(namespace, &name).await? {
            None => {
                info!("Backing up new secret: {}/{}", namespace, name);
                SyncDecision::Created
            }
            Some(existing) if Fingerprint::of(&existing) == current => {
                info!("Skipping unchanged secret: {}/{}", namespace, name);
                return Ok(RecordOutcome::new(namespace, name, SyncDecision::Unchanged));
            }
            Some(_) => {
                info!("Updating changed secret backup: {}/{}", namespace, name);
                SyncDecision::Updated
            }
        };

        self.store.put(namespace, &name, bytes).await?;
        debug!("Stored {}/{} ({})", namespace, name, current);

        Ok(RecordOutcome::new(namespace, name, decision))
    }

    /// Stored blobs with no live secret behind them
    ///
    /// They are reported and left in place; backups are additive.
    async fn orphaned_blobs(
        &self,
        namespace: &str,
        live: &HashSet<String>,
    ) -> Result<Vec<RecordOutcome>, SyncError> {
        let root = self.store.backup_root();
        let keys = self.store.list(namespace).await?;

        Ok(keys
            .iter()
            .filter_map(|key| BlobKey::parse(root, namespace, key))
            .filter(|key| !live.contains(key.name()))
            .map(|key| {
                info!("Backup {} has no live secret, leaving it in place", key);
                RecordOutcome::new(namespace, key.name(), SyncDecision::DeletionNotSupported)
            })
            .collect())
    }
}
